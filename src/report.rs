//! Sweep result rendering
//!
//! Two output shapes: the classic one-line-per-bucket text form
//! (`Bytes:N usecs:N MB/s:F`) that downstream log scrapers already parse,
//! and a JSON document carrying the configuration alongside the results.

use std::io;

use serde::Serialize;

use crate::sampler::{SizeBucket, SweepConfig};

/// A completed sweep: the device it ran against, the configuration used,
/// and one measured bucket per transfer size.
#[derive(Debug, Serialize)]
pub struct SweepReport {
    pub device: String,
    pub config: SweepConfig,
    pub buckets: Vec<SizeBucket>,
}

/// One rendered result row. `mb_per_sec` is `None` (JSON `null`) when the
/// accumulated time was zero and the rate is not a finite number.
#[derive(Debug, Serialize)]
struct BucketRecord {
    bytes: u64,
    usecs: u64,
    mb_per_sec: Option<f64>,
}

#[derive(Serialize)]
struct JsonReport<'a> {
    /// Format version identifier
    version: &'static str,
    device: &'a str,
    config: &'a SweepConfig,
    results: Vec<BucketRecord>,
}

impl SweepReport {
    pub fn new(device: String, config: SweepConfig, buckets: Vec<SizeBucket>) -> Self {
        Self {
            device,
            config,
            buckets,
        }
    }

    fn records(&self) -> Vec<BucketRecord> {
        self.buckets
            .iter()
            .map(|bucket| {
                let rate = bucket.mb_per_sec(self.config.averaging_divisor);
                BucketRecord {
                    bytes: bucket.size_bytes,
                    usecs: bucket.total_time_us,
                    mb_per_sec: rate.is_finite().then_some(rate),
                }
            })
            .collect()
    }

    /// Classic text form, one line per bucket:
    /// `Bytes:1024 usecs:512 MB/s:4.000000`
    ///
    /// An infinite rate renders as `inf`, matching what the reference tool
    /// printed for a zero accumulator.
    pub fn write_text<W: io::Write>(&self, out: &mut W) -> io::Result<()> {
        for bucket in &self.buckets {
            writeln!(
                out,
                "Bytes:{} usecs:{} MB/s:{:.6}",
                bucket.size_bytes,
                bucket.total_time_us,
                bucket.mb_per_sec(self.config.averaging_divisor)
            )?;
        }
        Ok(())
    }

    /// Pretty-printed JSON document with the device, the full sweep
    /// configuration, and the per-bucket results.
    pub fn to_json_string(&self) -> serde_json::Result<String> {
        let doc = JsonReport {
            version: env!("CARGO_PKG_VERSION"),
            device: &self.device,
            config: &self.config,
            results: self.records(),
        };
        serde_json::to_string_pretty(&doc)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report_with(buckets: Vec<SizeBucket>) -> SweepReport {
        SweepReport::new(
            "/dev/xdma0_h2c_0".to_string(),
            SweepConfig::default(),
            buckets,
        )
    }

    #[test]
    fn test_text_line_matches_reference_format() {
        let report = report_with(vec![SizeBucket {
            size_bytes: 1024,
            total_time_us: 512,
        }]);
        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        // 1024 / (512 / 2) = 4.0
        assert_eq!(
            String::from_utf8(out).unwrap(),
            "Bytes:1024 usecs:512 MB/s:4.000000\n"
        );
    }

    #[test]
    fn test_text_zero_time_renders_inf() {
        let report = report_with(vec![SizeBucket {
            size_bytes: 2,
            total_time_us: 0,
        }]);
        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        assert_eq!(String::from_utf8(out).unwrap(), "Bytes:2 usecs:0 MB/s:inf\n");
    }

    #[test]
    fn test_text_one_line_per_bucket_in_size_order() {
        let report = report_with(vec![
            SizeBucket {
                size_bytes: 2,
                total_time_us: 10,
            },
            SizeBucket {
                size_bytes: 4,
                total_time_us: 10,
            },
        ]);
        let mut out = Vec::new();
        report.write_text(&mut out).unwrap();
        let text = String::from_utf8(out).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].starts_with("Bytes:2 "));
        assert!(lines[1].starts_with("Bytes:4 "));
    }

    #[test]
    fn test_json_carries_config_and_results() {
        let report = report_with(vec![SizeBucket {
            size_bytes: 1024,
            total_time_us: 512,
        }]);
        let doc: serde_json::Value =
            serde_json::from_str(&report.to_json_string().unwrap()).unwrap();

        assert_eq!(doc["version"], env!("CARGO_PKG_VERSION"));
        assert_eq!(doc["device"], "/dev/xdma0_h2c_0");
        assert_eq!(doc["config"]["trials"], 10);
        assert_eq!(doc["config"]["averaging_divisor"], 2);
        assert_eq!(doc["results"][0]["bytes"], 1024);
        assert_eq!(doc["results"][0]["usecs"], 512);
        assert_eq!(doc["results"][0]["mb_per_sec"], 4.0);
    }

    #[test]
    fn test_json_infinite_rate_is_null() {
        let report = report_with(vec![SizeBucket {
            size_bytes: 2,
            total_time_us: 0,
        }]);
        let doc: serde_json::Value =
            serde_json::from_str(&report.to_json_string().unwrap()).unwrap();
        assert!(doc["results"][0]["mb_per_sec"].is_null());
    }
}
