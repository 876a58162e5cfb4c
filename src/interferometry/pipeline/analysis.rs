use std::fs::File;
use std::io::Write;
use std::path::{Path, PathBuf};

use tracing::{info, info_span, instrument};

use crate::interferometry::common::{AnalysisError, Mask, PipelineTimings, Result, Timer};
use crate::interferometry::export::{MapWriter, TiffMapWriter};
use crate::interferometry::frames::{FrameSource, PhaseShiftSet, RawLoaderReader, TiffFrameReader};
use crate::interferometry::optics::{PsfEvaluator, Wavefront};
use crate::interferometry::phase::{extract_phase_masked, gaussian_filter, to_waves, unwrap_phase};
use crate::interferometry::pipeline::types::{AnalysisConfig, AnalysisReport, CorrectedSurface};
use crate::interferometry::surface::{fit_zernike, surface_statistics_masked};

/// Smallest frame side the unwrapper and the Zernike grid accept.
const MIN_FRAME_SIDE: usize = 2;

fn read_file(path: &Path) -> Result<Vec<u8>> {
    std::fs::read(path).map_err(|e| AnalysisError::InputReadError(format!("{}: {}", path.display(), e)))
}

/// Interferograms in, surface, statistics and PSF/MTF out.
pub struct InterferogramPipeline<S: FrameSource, W: MapWriter> {
    source: S,
    writer: W,
    config: AnalysisConfig,
}

impl InterferogramPipeline<TiffFrameReader, TiffMapWriter> {
    pub fn new(config: AnalysisConfig) -> Self {
        Self {
            source: TiffFrameReader,
            writer: TiffMapWriter,
            config,
        }
    }
}

impl InterferogramPipeline<RawLoaderReader, TiffMapWriter> {
    /// Pipeline reading camera RAW files.
    pub fn for_raw(config: AnalysisConfig) -> Self {
        Self {
            source: RawLoaderReader,
            writer: TiffMapWriter,
            config,
        }
    }
}

impl<S: FrameSource, W: MapWriter> InterferogramPipeline<S, W> {
    pub fn with_custom(source: S, writer: W, config: AnalysisConfig) -> Self {
        Self { source, writer, config }
    }

    fn validate_dimensions(&self, width: usize, height: usize) -> Result<()> {
        if !self.config.validate_dimensions {
            return Ok(());
        }

        if width < MIN_FRAME_SIDE || height < MIN_FRAME_SIDE {
            return Err(AnalysisError::InvalidDimensions(width, height));
        }

        Ok(())
    }

    /// Decodes five frame buffers and analyses them.
    #[instrument(skip_all, fields(frames = frames.len()))]
    pub fn analyze(&self, frames: &[&[u8]], mask: Option<&Mask>) -> Result<AnalysisReport> {
        let timer = Timer::start("decode_frames");
        let decoded = {
            let _span = info_span!("decode_frames").entered();
            frames
                .iter()
                .map(|data| self.source.read_frame(data))
                .collect::<Result<Vec<_>>>()?
        };
        let set = PhaseShiftSet::new(decoded)?;
        let mut timings = PipelineTimings::new();
        timings.record(timer);

        self.analyze_set_with_timings(&set, mask, timings)
    }

    /// Analyses an already decoded set, e.g. one delivered by an acquisition.
    pub fn analyze_set(&self, set: &PhaseShiftSet, mask: Option<&Mask>) -> Result<AnalysisReport> {
        self.analyze_set_with_timings(set, mask, PipelineTimings::new())
    }

    fn analyze_set_with_timings(
        &self,
        set: &PhaseShiftSet,
        mask: Option<&Mask>,
        mut timings: PipelineTimings,
    ) -> Result<AnalysisReport> {
        let (width, height) = set.shape();
        info!(width, height, "Starting interferogram analysis");
        {
            let _span = info_span!("validate_dimensions", width, height).entered();
            self.validate_dimensions(width, height)?;
        }

        let full_mask;
        let mask = match mask {
            Some(mask) => {
                set.ensure_mask_fits(mask)?;
                mask
            }
            None => {
                full_mask = Mask::filled(width, height, true)?;
                &full_mask
            }
        };

        let timer = Timer::start("crop");
        let (set, mask) = {
            let _span = info_span!("crop_to_mask").entered();
            let region = mask.bounding_box().ok_or(AnalysisError::EmptySurface)?;
            if self.config.crop_to_mask {
                (set.crop(&region)?, mask.crop(&region)?)
            } else {
                (set.clone(), mask.clone())
            }
        };
        timings.record(timer);

        let set = match self.config.gaussian_sigma {
            Some(sigma) => {
                let timer = Timer::start("gaussian_filter");
                let _span = info_span!("gaussian_filter", sigma).entered();
                let filtered = set.map_frames(|frame| gaussian_filter(frame, sigma))?;
                timings.record(timer);
                filtered
            }
            None => set,
        };

        let timer = Timer::start("extract_phase");
        let wrapped_phase = {
            let _span = info_span!("extract_phase").entered();
            extract_phase_masked(&set, &mask)?
        };
        timings.record(timer);

        let timer = Timer::start("unwrap_phase");
        let surface = {
            let _span = info_span!("unwrap_phase").entered();
            to_waves(&unwrap_phase(&wrapped_phase)?, self.config.wedge_factor)
        };
        timings.record(timer);

        let timer = Timer::start("statistics");
        let statistics = surface_statistics_masked(&surface, &mask)?;
        timings.record(timer);

        let removed = &self.config.remove_aberrations;
        let (zernike, corrected) = if self.config.fit_zernike || !removed.is_empty() {
            let timer = Timer::start("zernike");
            let _span = info_span!("zernike", removed = removed.len()).entered();
            let fit = fit_zernike(&surface)?;
            let corrected = if removed.is_empty() {
                None
            } else {
                let (correction, corrected_surface) = fit.correct(&surface, removed)?;
                let statistics = surface_statistics_masked(&corrected_surface, &mask)?;
                Some(CorrectedSurface {
                    removed: removed.clone(),
                    correction,
                    surface: corrected_surface,
                    statistics,
                })
            };
            timings.record(timer);
            (Some(fit), corrected)
        } else {
            (None, None)
        };

        let timer = Timer::start("psf");
        let psf = {
            let _span = info_span!("psf").entered();
            let target = corrected.as_ref().map_or(&surface, |corrected| &corrected.surface);
            let wavefront = Wavefront::from_surface(target, &mask)?;
            PsfEvaluator::new(self.config.psf).evaluate(&wavefront)?
        };
        timings.record(timer);

        info!(
            peak_to_valley = statistics.peak_to_valley,
            rms = statistics.rms,
            total_ms = timings.total_duration().as_secs_f64() * 1000.0,
            "Analysis complete"
        );
        Ok(AnalysisReport {
            wrapped_phase,
            surface,
            mask,
            statistics,
            zernike,
            corrected,
            psf,
            timings,
        })
    }

    #[instrument(skip_all)]
    pub fn analyze_files<P: AsRef<Path>, Q: AsRef<Path>>(
        &self,
        frame_paths: &[P],
        mask_path: Option<Q>,
    ) -> Result<AnalysisReport> {
        let timer = Timer::start("read_input_files");
        let buffers = {
            let _span = info_span!("read_input_files").entered();
            frame_paths
                .iter()
                .map(|path| read_file(path.as_ref()))
                .collect::<Result<Vec<_>>>()?
        };
        let mask = match mask_path {
            Some(path) => {
                let levels = self.source.read_frame(&read_file(path.as_ref())?)?;
                Some(Mask::from_levels(&levels))
            }
            None => None,
        };
        let (read_step, read_duration) = timer.stop();

        let slices: Vec<&[u8]> = buffers.iter().map(Vec::as_slice).collect();
        let mut report = self.analyze(&slices, mask.as_ref())?;

        let mut timings = PipelineTimings::new();
        timings.add_step(read_step, read_duration);
        for step in report.timings.steps() {
            timings.add_step(step.name.clone(), step.duration);
        }
        report.timings = timings;
        Ok(report)
    }

    /// Writes every map of `report` through the configured writer. `open`
    /// provides the sink for each file name. Returns the names written.
    pub fn write_maps(
        &self,
        report: &AnalysisReport,
        mut open: impl FnMut(&str) -> Result<Box<dyn Write>>,
    ) -> Result<Vec<String>> {
        let _span = info_span!("write_maps").entered();
        let compression = self.config.compression;
        let mtf = report.psf.mtf_centered();
        let mut maps = vec![
            ("wrapped_phase.tiff", &report.wrapped_phase),
            ("surface.tiff", &report.surface),
            ("psf_db.tiff", &report.psf.psf_db),
        ];
        maps.push(("mtf.tiff", &mtf));
        if let Some(corrected) = &report.corrected {
            maps.push(("corrected_surface.tiff", &corrected.surface));
            maps.push(("correction.tiff", &corrected.correction));
        }

        let mut written = Vec::with_capacity(maps.len() + 1);
        for (name, map) in maps {
            let mut output = open(name)?;
            self.writer.write_map(map, &mut *output, compression)?;
            written.push(name.to_string());
        }
        let mut output = open("mask.tiff")?;
        self.writer.write_mask(&report.mask, &mut *output, compression)?;
        written.push("mask.tiff".to_string());

        Ok(written)
    }

    /// Writes the report maps as files under `output_dir`.
    #[instrument(skip(self, report, output_dir))]
    pub fn export<P: AsRef<Path>>(&self, report: &AnalysisReport, output_dir: P) -> Result<Vec<PathBuf>> {
        let output_dir = output_dir.as_ref();
        std::fs::create_dir_all(output_dir)
            .map_err(|e| AnalysisError::OutputWriteError(format!("{}: {}", output_dir.display(), e)))?;

        let names = self.write_maps(report, |name| {
            let path = output_dir.join(name);
            let file = File::create(&path)
                .map_err(|e| AnalysisError::OutputWriteError(format!("{}: {}", path.display(), e)))?;
            Ok(Box::new(file) as Box<dyn Write>)
        })?;

        info!(output = %output_dir.display(), files = names.len(), "Maps exported");
        Ok(names.into_iter().map(|name| output_dir.join(name)).collect())
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    pub fn set_config(&mut self, config: AnalysisConfig) {
        self.config = config;
    }
}
