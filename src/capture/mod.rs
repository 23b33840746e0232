use crate::error::Error;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::time::Duration;

/// Device coordinates as reported by the caller's geolocation provider
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

/// Evidence upload folder tag. Distinguishes evidence categories in the
/// object store but carries no behavioral difference in the core.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EvidenceFolder {
    PanicEvidence,
    IncidentPhotos,
    EventPhotos,
}

impl Display for EvidenceFolder {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PanicEvidence => write!(f, "panic-evidence"),
            Self::IncidentPhotos => write!(f, "incident-photos"),
            Self::EventPhotos => write!(f, "event-photos"),
        }
    }
}

/// Best-effort geolocation collaborator
#[async_trait]
pub trait GeoCapture: Send + Sync {
    /// Get the current device position
    async fn current_position(&self) -> Result<GeoPoint, Error>;
}

/// Evidence object store collaborator
#[async_trait]
pub trait EvidenceStore: Send + Sync {
    /// Upload an image, returning its stable URL
    async fn upload(
        &self,
        data: Vec<u8>,
        file_name: &str,
        folder: EvidenceFolder,
    ) -> Result<String, Error>;
}

/// Capture the current position with a timeout. Failures map to
/// LocationUnavailable; the caller proceeds without coordinates.
pub async fn capture_position(
    geo: &dyn GeoCapture,
    timeout: Duration,
) -> Result<GeoPoint, Error> {
    match tokio::time::timeout(timeout, geo.current_position()).await {
        Ok(result) => result,
        Err(_) => Err(Error::LocationUnavailable(format!(
            "Geolocation timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

/// Upload evidence with a timeout. Failures map to UploadError; the caller
/// proceeds without the photo.
pub async fn store_evidence(
    store: &dyn EvidenceStore,
    data: Vec<u8>,
    file_name: &str,
    folder: EvidenceFolder,
    timeout: Duration,
) -> Result<String, Error> {
    match tokio::time::timeout(timeout, store.upload(data, file_name, folder)).await {
        Ok(result) => result,
        Err(_) => Err(Error::UploadError(format!(
            "Evidence upload timed out after {}s",
            timeout.as_secs()
        ))),
    }
}

#[cfg(test)]
pub mod fakes {
    use super::*;

    /// Geolocation fake returning a fixed point
    pub struct FixedGeoCapture(pub GeoPoint);

    #[async_trait]
    impl GeoCapture for FixedGeoCapture {
        async fn current_position(&self) -> Result<GeoPoint, Error> {
            Ok(self.0)
        }
    }

    /// Geolocation fake that always fails
    pub struct UnavailableGeoCapture;

    #[async_trait]
    impl GeoCapture for UnavailableGeoCapture {
        async fn current_position(&self) -> Result<GeoPoint, Error> {
            Err(Error::LocationUnavailable("No position fix".to_string()))
        }
    }

    /// Evidence store fake returning a deterministic URL
    pub struct InMemoryEvidenceStore;

    #[async_trait]
    impl EvidenceStore for InMemoryEvidenceStore {
        async fn upload(
            &self,
            _data: Vec<u8>,
            file_name: &str,
            folder: EvidenceFolder,
        ) -> Result<String, Error> {
            Ok(format!("https://evidence.local/{}/{}", folder, file_name))
        }
    }

    /// Evidence store fake that always fails
    pub struct FailingEvidenceStore;

    #[async_trait]
    impl EvidenceStore for FailingEvidenceStore {
        async fn upload(
            &self,
            _data: Vec<u8>,
            _file_name: &str,
            _folder: EvidenceFolder,
        ) -> Result<String, Error> {
            Err(Error::UploadError("Object store rejected upload".to_string()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::fakes::*;
    use super::*;
    use crate::error::Error;

    struct SlowGeoCapture;

    #[async_trait]
    impl GeoCapture for SlowGeoCapture {
        async fn current_position(&self) -> Result<GeoPoint, Error> {
            tokio::time::sleep(Duration::from_secs(60)).await;
            Ok(GeoPoint {
                latitude: 0.0,
                longitude: 0.0,
            })
        }
    }

    #[tokio::test]
    async fn capture_position_times_out() {
        let result = capture_position(&SlowGeoCapture, Duration::from_millis(20)).await;
        assert!(matches!(result, Err(Error::LocationUnavailable(_))));
    }

    #[tokio::test]
    async fn evidence_upload_returns_url() {
        let url = store_evidence(
            &InMemoryEvidenceStore,
            vec![1, 2, 3],
            "panic.jpg",
            EvidenceFolder::PanicEvidence,
            Duration::from_secs(5),
        )
        .await
        .unwrap();

        assert_eq!(url, "https://evidence.local/panic-evidence/panic.jpg");
    }
}
