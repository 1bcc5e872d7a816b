use crate::types::ReportFingerprint;
use sha2::{Digest, Sha256};

/// Fingerprint an audit report: SHA-256 over the exact report bytes.
pub fn fingerprint_report(report: &[u8]) -> ReportFingerprint {
    let hash = Sha256::digest(report);
    let mut out = [0u8; 32];
    out.copy_from_slice(&hash);
    ReportFingerprint(out)
}
