use std::path::PathBuf;

use rand::RngCore;
use tracing::{info, warn};

use crate::foundation::error::{ReelError, ReelResult};
use crate::motion::MotionEffect;

/// Default cap on scenes per video.
pub const DEFAULT_MAX_SCENES: usize = 10;

/// Default drift tolerance for duration reconciliation.
pub const DEFAULT_TOLERANCE_SECS: f64 = 0.050;

/// One paragraph-derived unit of video.
#[derive(Clone, Debug, serde::Serialize)]
pub struct Scene {
    /// Index into the full paragraph list the scene was selected from.
    pub paragraph_index: usize,
    pub text: String,
    /// Normalized image on disk; `None` until acquired, or if acquisition failed.
    pub image: Option<PathBuf>,
    pub duration_secs: f64,
    pub effect: MotionEffect,
}

/// Indices of the paragraphs that become scenes.
///
/// Over the cap, every `len / max_scenes`-th paragraph is taken and the selection is cut at
/// `max_scenes`; paragraphs off the stride are dropped.
pub fn select_paragraph_indices(paragraph_count: usize, max_scenes: usize) -> Vec<usize> {
    if paragraph_count <= max_scenes {
        return (0..paragraph_count).collect();
    }
    let stride = (paragraph_count / max_scenes.max(1)).max(1);
    (0..paragraph_count)
        .step_by(stride)
        .take(max_scenes)
        .collect()
}

/// Select paragraphs and give each an equal share of `total_secs`.
pub fn allocate(
    paragraphs: &[String],
    total_secs: f64,
    max_scenes: usize,
    rng: &mut dyn RngCore,
) -> ReelResult<Vec<Scene>> {
    let selected = select_paragraph_indices(paragraphs.len(), max_scenes);
    if selected.is_empty() {
        return Err(ReelError::allocation("script has no paragraphs to turn into scenes"));
    }
    if selected.len() < paragraphs.len() {
        info!(
            paragraphs = paragraphs.len(),
            selected = selected.len(),
            "scene cap reached, subsampling paragraphs"
        );
    }

    let per_scene = total_secs / selected.len() as f64;
    Ok(selected
        .into_iter()
        .map(|i| Scene {
            paragraph_index: i,
            text: paragraphs[i].clone(),
            image: None,
            duration_secs: per_scene,
            effect: MotionEffect::choose(rng),
        })
        .collect())
}

/// Make the kept scenes' durations sum to `total_secs`.
///
/// When the drift exceeds `tolerance_secs` the whole residual goes to the last scene, whose
/// duration is floored at zero. Returns the residual that was applied (0.0 when within
/// tolerance).
pub fn reconcile(kept: &mut [Scene], total_secs: f64, tolerance_secs: f64) -> ReelResult<f64> {
    let sum: f64 = kept.iter().map(|s| s.duration_secs).sum();
    let Some(last) = kept.last_mut() else {
        return Err(ReelError::allocation("no scenes survived image acquisition"));
    };

    let residual = total_secs - sum;
    if residual.abs() <= tolerance_secs {
        return Ok(0.0);
    }

    let adjusted = last.duration_secs + residual;
    if adjusted < 0.0 {
        warn!(
            scene = last.paragraph_index,
            residual, "residual would make last scene negative, flooring at zero"
        );
        last.duration_secs = 0.0;
    } else {
        last.duration_secs = adjusted;
    }
    Ok(residual)
}

#[cfg(test)]
mod tests {
    use rand::{SeedableRng, rngs::StdRng};

    use super::*;

    fn paragraphs(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("paragraph {i}")).collect()
    }

    fn total(scenes: &[Scene]) -> f64 {
        scenes.iter().map(|s| s.duration_secs).sum()
    }

    #[test]
    fn three_paragraphs_split_mixed_duration_equally() {
        let mut rng = StdRng::seed_from_u64(1);
        // 9.0 s narration + 1.5 s pad/silence.
        let scenes = allocate(&paragraphs(3), 10.5, 10, &mut rng).unwrap();
        assert_eq!(scenes.len(), 3);
        for s in &scenes {
            assert!((s.duration_secs - 3.5).abs() < 1e-12);
        }
    }

    #[test]
    fn fifteen_paragraphs_keep_first_ten() {
        assert_eq!(
            select_paragraph_indices(15, 10),
            (0..10).collect::<Vec<_>>()
        );
    }

    #[test]
    fn wide_stride_subsamples_and_caps() {
        assert_eq!(
            select_paragraph_indices(25, 10),
            vec![0, 2, 4, 6, 8, 10, 12, 14, 16, 18]
        );
        assert_eq!(select_paragraph_indices(30, 10), (0..30).step_by(3).collect::<Vec<_>>());
        assert_eq!(select_paragraph_indices(4, 10), vec![0, 1, 2, 3]);
    }

    #[test]
    fn empty_script_fails_allocation() {
        let mut rng = StdRng::seed_from_u64(1);
        assert!(allocate(&[], 10.0, 10, &mut rng).is_err());
    }

    #[test]
    fn dropped_scene_residual_goes_to_last_kept() {
        let mut rng = StdRng::seed_from_u64(2);
        let d_mix = 31.5;
        let mut scenes = allocate(&paragraphs(10), d_mix, 10, &mut rng).unwrap();
        scenes.remove(4);

        let applied = reconcile(&mut scenes, d_mix, DEFAULT_TOLERANCE_SECS).unwrap();
        assert_eq!(scenes.len(), 9);
        assert!((applied - 3.15).abs() < 1e-9);
        assert!((scenes[8].duration_secs - 6.3).abs() < 1e-9);
        assert!((total(&scenes) - d_mix).abs() <= 0.050);
    }

    #[test]
    fn any_failure_pattern_reconciles_to_total() {
        let d_mix = 47.25;
        for mask in 1u32..(1 << 10) {
            let mut rng = StdRng::seed_from_u64(u64::from(mask));
            let scenes = allocate(&paragraphs(10), d_mix, 10, &mut rng).unwrap();
            let mut kept: Vec<Scene> = scenes
                .into_iter()
                .enumerate()
                .filter(|(i, _)| mask & (1 << i) != 0)
                .map(|(_, s)| s)
                .collect();
            reconcile(&mut kept, d_mix, DEFAULT_TOLERANCE_SECS).unwrap();
            assert!((total(&kept) - d_mix).abs() <= 0.050, "mask={mask:#b}");
        }
    }

    #[test]
    fn small_drift_is_left_alone() {
        let mut rng = StdRng::seed_from_u64(3);
        let mut scenes = allocate(&paragraphs(3), 9.0, 10, &mut rng).unwrap();
        scenes[0].duration_secs += 0.02;
        assert_eq!(reconcile(&mut scenes, 9.0, DEFAULT_TOLERANCE_SECS).unwrap(), 0.0);
        assert!((scenes[2].duration_secs - 3.0).abs() < 1e-12);
    }

    #[test]
    fn negative_residual_is_floored_at_zero() {
        let mut rng = StdRng::seed_from_u64(4);
        let mut scenes = allocate(&paragraphs(2), 10.0, 10, &mut rng).unwrap();
        scenes[0].duration_secs = 20.0;
        reconcile(&mut scenes, 10.0, DEFAULT_TOLERANCE_SECS).unwrap();
        assert_eq!(scenes[1].duration_secs, 0.0);
    }

    #[test]
    fn no_survivors_is_an_error() {
        let mut none: Vec<Scene> = Vec::new();
        assert!(reconcile(&mut none, 10.0, DEFAULT_TOLERANCE_SECS).is_err());
    }
}
