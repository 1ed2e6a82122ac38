//! Loop region export for PlaybackEngine
//!
//! Writes `[A, B)` to `{track}_{MMSS}[_{n}].wav`, where `MMSS` is point A
//! and `n` the first suffix that makes the name unique.

use super::core::PlaybackEngine;
use crate::audio::writer::{create_unique, write_wav};
use crate::config::ExportTempo;
use crate::error::{Error, Result};
use crate::tempo::ratio_for_percent;
use loopr_common::human_time::format_compact_stamp;
use std::fs;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

impl PlaybackEngine {
    /// Save the A-B region into `dir` and return the new file name.
    ///
    /// With `export_tempo = "stretched"` and a tempo other than 100%, the
    /// region is time-stretched first; if that fails it is saved as is.
    pub fn save_loop_region(&self, dir: &Path) -> Result<String> {
        let result = {
            let _control = self.control();
            self.export_locked(dir)
        };
        if let Ok(name) = &result {
            self.shared.info(format!("Guardado: {}", name));
        }
        self.report(result)
    }

    /// Save the A-B region into the configured output directory.
    pub fn save_loop_region_default(&self) -> Result<String> {
        let dir = self.shared.config.output_dir.clone();
        self.save_loop_region(&dir)
    }

    fn export_locked(&self, dir: &Path) -> Result<String> {
        let (track, a, b, percent) = {
            let s = self.shared.session();
            Self::require_track(&s)?;
            let (a, b) = s.region.both().ok_or_else(|| {
                Error::InvalidLoopRegion("mark both A and B before saving".to_string())
            })?;
            let track = s.track.clone().ok_or(Error::NoTrackLoaded)?;
            (track, a, b, s.tempo_percent)
        };

        let mut region = track.extract(a, b);
        if region.is_empty() {
            return Err(Error::InvalidLoopRegion(format!(
                "A ({:.3}s) and B ({:.3}s) enclose no audio",
                a, b
            )));
        }

        if self.shared.config.export_tempo == ExportTempo::Stretched && percent != 100 {
            match self.backend.stretch(
                &region,
                track.sample_rate(),
                track.channels(),
                ratio_for_percent(percent),
            ) {
                Ok(stretched) if !stretched.is_empty() => region = stretched,
                Ok(_) => warn!("Stretch returned no audio, exporting at 100%"),
                Err(e) => {
                    warn!("Exporting at 100%: {}", e);
                    self.shared
                        .warning(format!("Guardando sin tempo ({})", e));
                }
            }
        }

        let (file, name) = create_unique(dir, track.name(), &format_compact_stamp(a))?;
        if let Err(e) = write_wav(
            BufWriter::new(file),
            &region,
            track.sample_rate(),
            track.channels(),
        ) {
            let _ = fs::remove_file(dir.join(&name));
            return Err(e);
        }

        info!(
            "Saved loop {:.3}s..{:.3}s at {}% to {}",
            a,
            b,
            percent,
            dir.join(&name).display()
        );
        Ok(name)
    }
}
