//! Reading and validating the external WiFi status banner file.

use std::path::Path;

use tracing::{debug, warn};

use crate::state::{WifiBannerRecord, WifiBannerState};

/// Read and validate the banner file at `path`.
///
/// Returns `None` if the file does not exist, is not valid UTF-8 JSON, or
/// fails validation (empty message, non-positive timestamp, duration
/// outside `[0, 300]`). On a corrupt file, best-effort deletes it and
/// returns `None` rather than surfacing an error.
pub fn read_banner(path: &Path) -> Option<WifiBannerState> {
    let raw = std::fs::read_to_string(path).ok()?;
    match serde_json::from_str::<WifiBannerRecord>(&raw) {
        Ok(record) => match WifiBannerState::from_record(record) {
            Some(state) => Some(state),
            None => {
                warn!(?path, "wifi status record failed validation; deleting");
                let _ = std::fs::remove_file(path);
                None
            }
        },
        Err(err) => {
            warn!(?path, %err, "wifi status file is malformed; deleting");
            let _ = std::fs::remove_file(path);
            None
        }
    }
}

/// Delete the banner file if the current state has expired.
pub fn cleanup_if_expired(path: &Path, state: Option<&WifiBannerState>) {
    if let Some(state) = state {
        if !state.is_valid() {
            debug!(?path, "wifi status banner expired; deleting");
            let _ = std::fs::remove_file(path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn corrupt_file_is_deleted() {
        let dir = std::env::temp_dir().join(format!("ledctl-wifi-test-{}", std::process::id()));
        std::fs::write(&dir, b"not json").expect("write fixture");
        assert!(read_banner(&dir).is_none());
        assert!(!dir.exists());
    }

    #[test]
    fn valid_record_parses() {
        let dir = std::env::temp_dir().join(format!("ledctl-wifi-test-valid-{}", std::process::id()));
        let mut file = std::fs::File::create(&dir).expect("create fixture");
        writeln!(file, r#"{{"message":"Connected","timestamp":{},"duration":5}}"#, 9_999_999_999.0_f64).expect("write");
        drop(file);
        let state = read_banner(&dir).expect("valid banner");
        assert_eq!(state.message, "Connected");
        let _ = std::fs::remove_file(&dir);
    }
}
