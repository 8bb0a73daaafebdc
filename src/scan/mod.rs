//! Scan sessions: a bounded listening window over an advertisement
//! source.
//!
//! Platform-specific advertisement delivery lives behind the
//! [`AdvertisementSource`] trait; this module owns the session loop that
//! feeds every payload through one [`Reassembler`] and forwards complete
//! records to the caller through a channel.

#[cfg(feature = "bluer")]
pub mod bluer;

use crate::advertisement::{AdvertisementError, Emission, Reassembler};
use crate::record::Record;
use log::debug;
use std::future::Future;
use std::pin::Pin;
use std::time::Duration;
use tokio::sync::mpsc;

/// A decoded reading, or a per-packet error when running verbose.
pub type ScanResult = Result<Record, AdvertisementError>;

/// Channel buffer size for scan results.
pub const SCAN_CHANNEL_BUFFER_SIZE: usize = 100;

/// Source of raw advertisement payloads (manufacturer data, company ID
/// already stripped).
///
/// Implementations adapt whatever delivery mechanism the underlying radio
/// stack offers; the session loop only ever sees raw byte payloads.
pub trait AdvertisementSource: Send + 'static {
    /// Next raw payload, or `None` when the source is exhausted.
    fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + '_>>;
}

/// Configuration for one scan session.
#[derive(Debug, Clone, Copy)]
pub struct ScanOptions {
    /// Length of the listening window.
    pub duration: Duration,
    /// Suppress packets repeating the last accepted sequence number.
    pub distinct: bool,
    /// Forward unrecognized-packet errors instead of dropping them.
    pub verbose: bool,
}

impl Default for ScanOptions {
    fn default() -> Self {
        ScanOptions {
            duration: Duration::from_secs(10),
            distinct: true,
            verbose: false,
        }
    }
}

/// Run one scan session over `source`.
///
/// A fresh [`Reassembler`] is created for the session and dropped with
/// it. The window closes after `options.duration` or when the source is
/// exhausted, whichever comes first; dropping the source releases
/// whatever listener it registered with the radio stack. A receiver that
/// stops reading never aborts the window; undeliverable results are
/// discarded.
pub async fn run_scan<S: AdvertisementSource>(
    mut source: S,
    options: ScanOptions,
) -> mpsc::Receiver<ScanResult> {
    let (tx, rx) = mpsc::channel(SCAN_CHANNEL_BUFFER_SIZE);

    tokio::spawn(async move {
        let mut reassembler = Reassembler::new();
        let window = tokio::time::sleep(options.duration);
        tokio::pin!(window);

        loop {
            tokio::select! {
                _ = &mut window => break,
                payload = source.next() => {
                    let Some(raw) = payload else { break };
                    match reassembler.on_packet(&raw, options.distinct) {
                        Ok(Emission::Record(record)) => {
                            let _ = tx.try_send(Ok(record));
                        }
                        Ok(Emission::Suppressed) => {}
                        Err(error) => {
                            debug!("skipping advertisement: {error}");
                            if options.verbose {
                                let _ = tx.try_send(Err(error));
                            }
                        }
                    }
                }
            }
        }
    });

    rx
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::{indication_packet, response_packet, simple_packet};

    /// Yields a fixed list of payloads, then ends.
    struct FakeSource {
        payloads: std::vec::IntoIter<Vec<u8>>,
    }

    impl FakeSource {
        fn new(payloads: Vec<Vec<u8>>) -> Self {
            FakeSource {
                payloads: payloads.into_iter(),
            }
        }
    }

    impl AdvertisementSource for FakeSource {
        fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + '_>> {
            let payload = self.payloads.next();
            Box::pin(async move { payload })
        }
    }

    async fn collect(mut rx: mpsc::Receiver<ScanResult>) -> Vec<ScanResult> {
        let mut results = Vec::new();
        while let Some(result) = rx.recv().await {
            results.push(result);
        }
        results
    }

    #[tokio::test]
    async fn test_scan_emits_complete_cycles() {
        let source = FakeSource::new(vec![
            indication_packet(5),
            response_packet(5),
            indication_packet(6),
            response_packet(6),
        ]);
        let rx = run_scan(source, ScanOptions::default()).await;
        let results = collect(rx).await;

        assert_eq!(results.len(), 2);
        let record = results[0].as_ref().unwrap();
        assert_eq!(record.raw("seq"), Some(5));
        assert!(record.get("temperature").is_some());
        assert!(record.get("thi").is_some());
    }

    #[tokio::test]
    async fn test_scan_distinct_filters_radio_repeats() {
        let source = FakeSource::new(vec![
            simple_packet(1),
            simple_packet(1),
            simple_packet(1),
            simple_packet(2),
        ]);
        let rx = run_scan(source, ScanOptions::default()).await;
        let results = collect(rx).await;
        assert_eq!(results.len(), 2);
    }

    #[tokio::test]
    async fn test_scan_errors_forwarded_only_when_verbose() {
        let bogus = vec![0x7F, 0x01, 0x00];

        let rx = run_scan(
            FakeSource::new(vec![bogus.clone(), simple_packet(1)]),
            ScanOptions::default(),
        )
        .await;
        let results = collect(rx).await;
        assert_eq!(results.len(), 1);
        assert!(results[0].is_ok());

        let rx = run_scan(
            FakeSource::new(vec![bogus, simple_packet(1)]),
            ScanOptions {
                verbose: true,
                ..ScanOptions::default()
            },
        )
        .await;
        let results = collect(rx).await;
        assert_eq!(results.len(), 2);
        assert!(results[0].is_err());
        assert!(results[1].is_ok());
    }

    #[tokio::test(start_paused = true)]
    async fn test_scan_window_closes_after_duration() {
        /// Never-ending source; the window timeout must end the session.
        struct PendingSource;

        impl AdvertisementSource for PendingSource {
            fn next(&mut self) -> Pin<Box<dyn Future<Output = Option<Vec<u8>>> + Send + '_>> {
                Box::pin(std::future::pending())
            }
        }

        let rx = run_scan(
            PendingSource,
            ScanOptions {
                duration: Duration::from_secs(3),
                ..ScanOptions::default()
            },
        )
        .await;
        // With the clock paused, collect() only finishes if the sleep
        // fires and the sender side is dropped.
        let results = collect(rx).await;
        assert!(results.is_empty());
    }
}
