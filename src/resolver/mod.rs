//! Walks candidate filenames until one turns out to be a real chart.

mod probe;

pub use probe::{classify_probe, ProbeVerdict};

use tracing::debug;

use crate::candidates::Candidate;
use crate::chart::{validate, Difficulty};
use crate::config::ResolverSettings;
use crate::transport::{AssetLocator, RetryingTransport};

/// How much checking a candidate gets before it is accepted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verification {
    /// Accept the first candidate as is; the caller validates later.
    None,
    /// Accept the first candidate whose probe says present.
    ProbeOnly,
    /// Probe, fetch and validate; the winner's content is returned.
    Full,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolution {
    /// `content` is set when the winner was fetched and validated.
    Found {
        candidate: Candidate,
        url: String,
        content: Option<Vec<u8>>,
    },
    /// The first candidate missed and the caller asked to stop there.
    NotAvailable { last_url: Option<String> },
    /// Every candidate missed.
    Exhausted { last_url: Option<String> },
}

pub struct Resolver {
    transport: RetryingTransport,
    locator: AssetLocator,
    settings: ResolverSettings,
}

impl Resolver {
    pub fn new(
        transport: RetryingTransport,
        locator: AssetLocator,
        settings: ResolverSettings,
    ) -> Self {
        Self {
            transport,
            locator,
            settings,
        }
    }

    pub fn locator(&self) -> &AssetLocator {
        &self.locator
    }

    /// Tries `candidates` in order.
    ///
    /// With `stop_after_first_miss` a miss on the first candidate ends the
    /// search with [`Resolution::NotAvailable`]. Used for difficulties the
    /// catalog does not declare, which almost never exist.
    pub async fn resolve(
        &self,
        song_id: u32,
        difficulty: Difficulty,
        candidates: &[Candidate],
        verification: Verification,
        stop_after_first_miss: bool,
    ) -> Resolution {
        let mut last_url = None;

        for candidate in candidates {
            let url = self.locator.chart_url(song_id, &candidate.filename);
            last_url = Some(url.clone());

            match verification {
                Verification::None => {
                    return Resolution::Found {
                        candidate: candidate.clone(),
                        url,
                        content: None,
                    };
                }
                Verification::ProbeOnly => {
                    let verdict = self.probe(&url).await;
                    debug!(
                        "Probe {} {} [{}] -> {:?}",
                        song_id, difficulty, candidate.tier, verdict
                    );
                    if verdict == ProbeVerdict::Present {
                        return Resolution::Found {
                            candidate: candidate.clone(),
                            url,
                            content: None,
                        };
                    }
                    if stop_after_first_miss && verdict == ProbeVerdict::Absent {
                        return Resolution::NotAvailable { last_url };
                    }
                }
                Verification::Full => {
                    if let Some(content) = self.fetch_verified(song_id, difficulty, candidate, &url).await {
                        return Resolution::Found {
                            candidate: candidate.clone(),
                            url,
                            content: Some(content),
                        };
                    }
                    if stop_after_first_miss {
                        return Resolution::NotAvailable { last_url };
                    }
                }
            }
        }

        Resolution::Exhausted { last_url }
    }

    async fn probe(&self, url: &str) -> ProbeVerdict {
        let result = self.transport.probe(url, self.settings.probe_range_bytes).await;
        classify_probe(&result)
    }

    /// Probe, then fetch when the verdict and the candidate's tier allow it.
    /// Returns the content only if it validates.
    async fn fetch_verified(
        &self,
        song_id: u32,
        difficulty: Difficulty,
        candidate: &Candidate,
        url: &str,
    ) -> Option<Vec<u8>> {
        let high_confidence = candidate.tier.is_high_confidence();
        let verdict = self.probe(url).await;
        debug!(
            "Probe {} {} [{}] {} -> {:?}",
            song_id, difficulty, candidate.tier, candidate.filename, verdict
        );

        // The host sometimes reports trusted names as missing; fetch them anyway.
        if verdict == ProbeVerdict::Absent && !high_confidence {
            return None;
        }

        let mut blob = self.fetch(url).await;

        if high_confidence {
            for attempt in 0..self.settings.html_retry_attempts {
                let is_html = match &blob {
                    Some(content) => {
                        let verdict = validate(content);
                        !verdict.valid && verdict.is_html_shell
                    }
                    None => false,
                };
                if !is_html {
                    break;
                }
                tokio::time::sleep(self.settings.html_retry_backoff(attempt)).await;
                debug!("Refetching {} after HTML response (attempt {})", url, attempt + 1);
                if let Some(content) = self.fetch(url).await {
                    blob = Some(content);
                }
            }
        }

        blob.filter(|content| validate(content).valid)
    }

    async fn fetch(&self, url: &str) -> Option<Vec<u8>> {
        match self.transport.fetch(url).await {
            Ok(content) => Some(content),
            Err(e) => {
                debug!("Fetch {} failed: {}", url, e);
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::candidates::CandidateTier;
    use crate::chart::HEADER_MARKER;
    use crate::transport::{AssetTransport, ProbeResponse, RetryPolicy, TransportError};
    use async_trait::async_trait;
    use std::collections::{HashMap, VecDeque};
    use std::sync::{Arc, Mutex};

    const BASE: &str = "http://host.test/assets";

    fn chart() -> Vec<u8> {
        let mut blob = b"BPM 120\n".to_vec();
        blob.extend_from_slice(HEADER_MARKER);
        blob.extend_from_slice(b"\n#notes\n");
        blob
    }

    fn html() -> Vec<u8> {
        b"<!DOCTYPE html><html></html>".to_vec()
    }

    /// Answers per URL; fetch answers can be queued to script retries.
    #[derive(Default)]
    struct MockHost {
        probes: Mutex<HashMap<String, ProbeResponse>>,
        fetches: Mutex<HashMap<String, VecDeque<Vec<u8>>>>,
        log: Mutex<Vec<String>>,
    }

    impl MockHost {
        fn probe_status(&self, url: &str, status: u16, head: Vec<u8>) {
            self.probes
                .lock()
                .unwrap()
                .insert(url.to_string(), ProbeResponse { status, head });
        }

        fn serve(&self, url: &str, bodies: Vec<Vec<u8>>) {
            self.fetches
                .lock()
                .unwrap()
                .insert(url.to_string(), bodies.into());
        }

        fn fetch_count(&self, url: &str) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|u| *u == &format!("GET {}", url))
                .count()
        }

        fn probe_count(&self) -> usize {
            self.log
                .lock()
                .unwrap()
                .iter()
                .filter(|u| u.starts_with("PROBE "))
                .count()
        }
    }

    #[async_trait]
    impl AssetTransport for MockHost {
        async fn probe(&self, url: &str, _max: u64) -> Result<ProbeResponse, TransportError> {
            self.log.lock().unwrap().push(format!("PROBE {}", url));
            Ok(self
                .probes
                .lock()
                .unwrap()
                .get(url)
                .cloned()
                .unwrap_or(ProbeResponse {
                    status: 404,
                    head: Vec::new(),
                }))
        }

        async fn fetch(&self, url: &str) -> Result<Vec<u8>, TransportError> {
            self.log.lock().unwrap().push(format!("GET {}", url));
            let mut fetches = self.fetches.lock().unwrap();
            match fetches.get_mut(url) {
                Some(queue) if queue.len() > 1 => Ok(queue.pop_front().unwrap_or_default()),
                Some(queue) => queue.front().cloned().ok_or(TransportError::Status(404)),
                None => Err(TransportError::Status(404)),
            }
        }
    }

    fn resolver(host: Arc<MockHost>) -> Resolver {
        Resolver::new(
            RetryingTransport::new(host, RetryPolicy::immediate(0)),
            AssetLocator::new(BASE, "cn"),
            ResolverSettings::immediate(),
        )
    }

    fn url(song_id: u32, filename: &str) -> String {
        AssetLocator::new(BASE, "cn").chart_url(song_id, filename)
    }

    fn candidate(filename: &str, tier: CandidateTier) -> Candidate {
        Candidate {
            filename: filename.to_string(),
            tier,
        }
    }

    #[tokio::test]
    async fn test_first_valid_candidate_wins() {
        let host = Arc::new(MockHost::default());
        let good = url(489, "489_mayoiuta_hard.txt");
        host.probe_status(&good, 206, chart());
        host.serve(&good, vec![chart()]);

        let candidates = vec![
            candidate("489_mayoi_uta_hard.txt", CandidateTier::Slug),
            candidate("489_mayoiuta_hard.txt", CandidateTier::Slug),
            candidate("489_mayoiuta2_hard.txt", CandidateTier::Slug),
        ];
        let resolution = resolver(host.clone())
            .resolve(489, Difficulty::Hard, &candidates, Verification::Full, false)
            .await;

        match resolution {
            Resolution::Found {
                candidate,
                url: found_url,
                content,
            } => {
                assert_eq!(candidate.filename, "489_mayoiuta_hard.txt");
                assert_eq!(found_url, good);
                assert_eq!(content, Some(chart()));
            }
            other => panic!("unexpected {:?}", other),
        }
        // Absent slug candidates are never fetched.
        assert_eq!(host.fetch_count(&url(489, "489_mayoi_uta_hard.txt")), 0);
        assert_eq!(host.probe_count(), 2);
    }

    #[tokio::test]
    async fn test_high_confidence_fetched_despite_absent_probe() {
        let host = Arc::new(MockHost::default());
        let target = url(604, "604_toridori_palette_normal.txt");
        host.probe_status(&target, 404, Vec::new());
        host.serve(&target, vec![chart()]);

        let candidates = vec![candidate(
            "604_toridori_palette_normal.txt",
            CandidateTier::Inferred,
        )];
        let resolution = resolver(host.clone())
            .resolve(604, Difficulty::Normal, &candidates, Verification::Full, false)
            .await;

        assert!(matches!(resolution, Resolution::Found { .. }));
        assert_eq!(host.fetch_count(&target), 1);
    }

    #[tokio::test]
    async fn test_html_response_retried_for_high_confidence() {
        let host = Arc::new(MockHost::default());
        let target = url(531, "531_ave_mujica_expert.txt");
        host.probe_status(&target, 200, html());
        host.serve(&target, vec![html(), html(), chart()]);

        let candidates = vec![candidate("531_ave_mujica_expert.txt", CandidateTier::Override)];
        let resolution = resolver(host.clone())
            .resolve(531, Difficulty::Expert, &candidates, Verification::Full, false)
            .await;

        assert!(matches!(resolution, Resolution::Found { .. }));
        assert_eq!(host.fetch_count(&target), 3);
    }

    #[tokio::test]
    async fn test_html_retries_are_bounded() {
        let host = Arc::new(MockHost::default());
        let target = url(531, "531_ave_mujica_expert.txt");
        host.probe_status(&target, 200, html());
        host.serve(&target, vec![html()]);

        let candidates = vec![candidate("531_ave_mujica_expert.txt", CandidateTier::Jacket)];
        let resolution = resolver(host.clone())
            .resolve(531, Difficulty::Expert, &candidates, Verification::Full, false)
            .await;

        assert_eq!(
            resolution,
            Resolution::Exhausted {
                last_url: Some(target.clone())
            }
        );
        // One fetch plus two retries.
        assert_eq!(host.fetch_count(&target), 3);
    }

    #[tokio::test]
    async fn test_slug_html_is_not_retried() {
        let host = Arc::new(MockHost::default());
        let target = url(700, "700_song_easy.txt");
        host.probe_status(&target, 503, Vec::new());
        host.serve(&target, vec![html()]);

        let candidates = vec![candidate("700_song_easy.txt", CandidateTier::Slug)];
        let resolution = resolver(host.clone())
            .resolve(700, Difficulty::Easy, &candidates, Verification::Full, false)
            .await;

        assert!(matches!(resolution, Resolution::Exhausted { .. }));
        // Unknown verdict still fetches once.
        assert_eq!(host.fetch_count(&target), 1);
    }

    #[tokio::test]
    async fn test_stop_after_first_miss() {
        let host = Arc::new(MockHost::default());
        let second = url(489, "489_mayoiuta_special.txt");
        host.probe_status(&second, 206, chart());
        host.serve(&second, vec![chart()]);

        let candidates = vec![
            candidate("489_mayoi_special.txt", CandidateTier::Slug),
            candidate("489_mayoiuta_special.txt", CandidateTier::Slug),
        ];
        let resolution = resolver(host.clone())
            .resolve(489, Difficulty::Special, &candidates, Verification::Full, true)
            .await;

        assert_eq!(
            resolution,
            Resolution::NotAvailable {
                last_url: Some(url(489, "489_mayoi_special.txt"))
            }
        );
        assert_eq!(host.probe_count(), 1);
    }

    #[tokio::test]
    async fn test_no_verification_takes_first() {
        let host = Arc::new(MockHost::default());
        let candidates = vec![
            candidate("1_a_easy.txt", CandidateTier::Slug),
            candidate("1_b_easy.txt", CandidateTier::Slug),
        ];
        let resolution = resolver(host.clone())
            .resolve(100, Difficulty::Easy, &candidates, Verification::None, false)
            .await;

        match resolution {
            Resolution::Found {
                candidate, content, ..
            } => {
                assert_eq!(candidate.filename, "1_a_easy.txt");
                assert!(content.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(host.probe_count(), 0);
    }

    #[tokio::test]
    async fn test_probe_only_never_fetches() {
        let host = Arc::new(MockHost::default());
        let second = url(489, "489_b_easy.txt");
        host.probe_status(&second, 206, chart());

        let candidates = vec![
            candidate("489_a_easy.txt", CandidateTier::Override),
            candidate("489_b_easy.txt", CandidateTier::Slug),
        ];
        let resolution = resolver(host.clone())
            .resolve(489, Difficulty::Easy, &candidates, Verification::ProbeOnly, false)
            .await;

        match resolution {
            Resolution::Found { url: found, content, .. } => {
                assert_eq!(found, second);
                assert!(content.is_none());
            }
            other => panic!("unexpected {:?}", other),
        }
        assert_eq!(host.fetch_count(&url(489, "489_a_easy.txt")), 0);
    }

    #[tokio::test]
    async fn test_no_candidates() {
        let host = Arc::new(MockHost::default());
        let resolution = resolver(host)
            .resolve(1, Difficulty::Easy, &[], Verification::Full, false)
            .await;
        assert_eq!(resolution, Resolution::Exhausted { last_url: None });
    }
}
