// SPDX-License-Identifier: AGPL-3.0-or-later
//! Fixed file names shared by the pipeline stages.
//!
//! Downstream stages assume upstream naming exactly; keeping every
//! path here is what makes that assumption hold.

/// Raw monthly grid files, one per month.
pub const RAW_DIR: &str = "data/raw/chirps_v3/monthly";

/// Clipped regional precipitation series.
pub const PR_FILE: &str = "data/processed/pr_monthly_cvalley_1991_2025.dsg";

/// Monthly climatology over the baseline window.
pub const CLIM_FILE: &str = "data/processed/pr_monthly_cvalley_clim_1991_2020.dsg";

/// Anomalies over the target window.
pub const ANOM_FILE: &str = "data/processed/pr_monthly_cvalley_anom_1991_2025.dsg";

/// Labels plus threshold provenance.
pub const LABELS_FILE: &str = "data/processed/pr_monthly_cvalley_labels_1991_2025.dsg";

/// Assembled tabular dataset.
pub const DATASET_FILE: &str = "data/processed/dataset_baseline.csv";

/// Stage outputs (metrics, plots, model artifacts).
pub const OUT_DIR: &str = "outputs";

/// Variable names inside the grid files.
pub mod var {
    /// Precipitation series.
    pub const PR: &str = "pr";
    /// Monthly climatology.
    pub const PR_CLIM: &str = "pr_clim";
    /// Precipitation anomaly.
    pub const PR_ANOM: &str = "pr_anom";
    /// Numeric drought label.
    pub const LABEL: &str = "drought_label";
    /// Low (20th percentile) threshold.
    pub const P20: &str = "pr_p20";
    /// High (80th percentile) threshold.
    pub const P80: &str = "pr_p80";
}
