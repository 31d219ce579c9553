use crate::loader::LoadedEnvironment;

const SI_UNITS: [&str; 8] = ["kB", "MB", "GB", "TB", "PB", "EB", "ZB", "YB"];
const IEC_UNITS: [&str; 8] = ["KiB", "MiB", "GiB", "TiB", "PiB", "EiB", "ZiB", "YiB"];

/// Formats a byte count for display, e.g. `2.3 MB` (SI) or `1.5 KiB` (IEC).
///
/// Values below one unit print as plain bytes. A value that would round up
/// to the next unit boundary is promoted, so 999 950 bytes reads `1.0 MB`
/// rather than `1000.0 kB`.
pub fn human_file_size(bytes: u64, si: bool, decimals: usize) -> String {
    let threshold = if si { 1000.0 } else { 1024.0 };
    if (bytes as f64) < threshold {
        return format!("{bytes} B");
    }
    let units = if si { &SI_UNITS } else { &IEC_UNITS };
    let scale = 10f64.powi(decimals as i32);

    let mut value = bytes as f64;
    let mut unit = 0;
    value /= threshold;
    while (value * scale).round() / scale >= threshold && unit < units.len() - 1 {
        value /= threshold;
        unit += 1;
    }
    format!("{value:.decimals$} {}", units[unit])
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AssetStats {
    pub asset_ref: String,
    pub transferred: u64,
    pub total: Option<u64>,
    pub resolution: Option<(u32, u32)>,
}

impl AssetStats {
    /// Fraction of the asset received, when the total size is known.
    pub fn progress(&self) -> Option<f32> {
        match self.total {
            Some(0) => Some(1.0),
            Some(total) => Some((self.transferred as f32 / total as f32).min(1.0)),
            None => None,
        }
    }
}

/// Byte and resolution bookkeeping. The load in flight is tracked apart from
/// the asset on screen, so a cancelled or failed load leaves the current
/// status label alone.
#[derive(Debug, Clone, Default)]
pub struct LoadTelemetry {
    loading: Option<AssetStats>,
    shown: Option<AssetStats>,
}

impl LoadTelemetry {
    pub fn begin(&mut self, asset_ref: &str) {
        self.loading = Some(AssetStats {
            asset_ref: asset_ref.to_string(),
            ..AssetStats::default()
        });
    }

    pub fn record_progress(&mut self, transferred: u64, total: Option<u64>) {
        if let Some(stats) = self.loading.as_mut() {
            stats.transferred = stats.transferred.max(transferred);
            stats.total = total.or(stats.total);
        }
    }

    pub fn record_loaded(&mut self, environment: &LoadedEnvironment) {
        let mut stats = self
            .loading
            .take()
            .filter(|stats| stats.asset_ref == environment.asset_ref)
            .unwrap_or_else(|| AssetStats {
                asset_ref: environment.asset_ref.clone(),
                ..AssetStats::default()
            });
        stats.transferred = stats.transferred.max(environment.byte_size);
        stats.resolution = Some((environment.width, environment.height));
        self.shown = Some(stats);
    }

    /// Forgets the load in flight.
    pub fn cancel(&mut self) {
        self.loading = None;
    }

    /// Stats of the load in flight, if any.
    pub fn stats(&self) -> Option<&AssetStats> {
        self.loading.as_ref()
    }

    /// Stats of the asset currently on screen.
    pub fn current(&self) -> Option<&AssetStats> {
        self.shown.as_ref()
    }

    /// `"<asset> size : <size>, Resolution: <w>x<h>"` for the asset on screen.
    pub fn status_label(&self) -> Option<String> {
        let stats = self.shown.as_ref()?;
        let (width, height) = stats.resolution?;
        let size = if stats.transferred == 0 {
            "unknown".to_string()
        } else {
            human_file_size(stats.transferred, true, 1)
        };
        Some(format!(
            "{} size : {}, Resolution: {}x{}",
            stats.asset_ref, size, width, height
        ))
    }
}
