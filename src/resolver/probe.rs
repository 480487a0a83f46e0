use crate::chart::validate;
use crate::transport::{ProbeResponse, TransportError};

/// Outcome of a ranged existence probe.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProbeVerdict {
    /// Success status and the head carries the chart header.
    Present,
    /// Definitive error status, or an HTML shell / non-chart body.
    Absent,
    /// Network trouble or a server error; says nothing about the file.
    Unknown,
}

/// Maps a probe result to a verdict.
///
/// The host answers many missing paths with `200` and an HTML shell, so a
/// success status alone never means present.
pub fn classify_probe(result: &Result<ProbeResponse, TransportError>) -> ProbeVerdict {
    match result {
        Ok(response) => match response.status {
            200 | 206 => {
                let verdict = validate(&response.head);
                if verdict.valid && !verdict.is_html_shell {
                    ProbeVerdict::Present
                } else {
                    ProbeVerdict::Absent
                }
            }
            status => classify_status(status),
        },
        Err(TransportError::Status(status)) => classify_status(*status),
        Err(_) => ProbeVerdict::Unknown,
    }
}

fn classify_status(status: u16) -> ProbeVerdict {
    if status >= 500 {
        ProbeVerdict::Unknown
    } else {
        ProbeVerdict::Absent
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chart::HEADER_MARKER;

    fn response(status: u16, head: &[u8]) -> Result<ProbeResponse, TransportError> {
        Ok(ProbeResponse {
            status,
            head: head.to_vec(),
        })
    }

    #[test]
    fn test_chart_head_is_present() {
        let mut head = b"Title block\r\n".to_vec();
        head.extend_from_slice(HEADER_MARKER);
        assert_eq!(classify_probe(&response(206, &head)), ProbeVerdict::Present);
        assert_eq!(classify_probe(&response(200, &head)), ProbeVerdict::Present);
    }

    #[test]
    fn test_html_shell_is_absent() {
        let head = b"  <!DOCTYPE html><html><body>app</body></html>";
        assert_eq!(classify_probe(&response(200, head)), ProbeVerdict::Absent);
    }

    #[test]
    fn test_other_bodies_are_absent() {
        assert_eq!(classify_probe(&response(200, b"")), ProbeVerdict::Absent);
        assert_eq!(classify_probe(&response(206, b"random")), ProbeVerdict::Absent);
    }

    #[test]
    fn test_status_classification() {
        assert_eq!(classify_probe(&response(404, b"")), ProbeVerdict::Absent);
        assert_eq!(classify_probe(&response(403, b"")), ProbeVerdict::Absent);
        assert_eq!(classify_probe(&response(503, b"")), ProbeVerdict::Unknown);
        assert_eq!(
            classify_probe(&Err(TransportError::Status(410))),
            ProbeVerdict::Absent
        );
    }

    #[test]
    fn test_network_errors_are_unknown() {
        assert_eq!(
            classify_probe(&Err(TransportError::Timeout("slow".into()))),
            ProbeVerdict::Unknown
        );
        assert_eq!(
            classify_probe(&Err(TransportError::Connection("reset".into()))),
            ProbeVerdict::Unknown
        );
    }
}
