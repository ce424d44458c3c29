//! End-to-end effects-chain run
//!
//! Opens the input, builds `input -> effects`, opens the output for the
//! signal those effects produce, adds `output` and flows the chain. The
//! chain is deleted before either stream is closed, on every exit path.

use std::path::PathBuf;
use std::time::{Duration, Instant};

use crate::audio::SignalInfo;
use crate::config::Config;
use crate::error::{Result, SoxError};
use crate::sox::{EffectSpec, EffectsChain, FlowControl, FlowOutcome, InputStream, OutputStream, Sox, WriteOptions};

/// What one chain run did
#[derive(Debug, Clone)]
pub struct ChainSummary {
    /// Effects in processing order, including `input` and `output`
    pub effects: Vec<String>,
    pub outcome: FlowOutcome,
    /// Samples clipped by effects
    pub effect_clips: u64,
    /// Samples clipped while encoding the output
    pub output_clips: u64,
}

#[derive(Debug, Clone)]
pub struct FlowReport {
    pub input_path: PathBuf,
    pub output_path: PathBuf,
    pub input_signal: SignalInfo,
    pub output_signal: SignalInfo,
    pub summary: ChainSummary,
    pub processing_time: Duration,
}

impl FlowReport {
    /// Processing time over audio duration; 0.0 if the input length is unknown
    pub fn real_time_factor(&self) -> f64 {
        let duration = self.input_signal.duration();
        if duration > 0.0 {
            self.processing_time.as_secs_f64() / duration
        } else {
            0.0
        }
    }

    pub fn clips(&self) -> u64 {
        self.summary.effect_clips + self.summary.output_clips
    }
}

type Progress<'p> = Option<&'p mut dyn FnMut(bool) -> FlowControl>;

#[derive(Debug)]
pub struct Pipeline<'s> {
    sox: &'s Sox,
    config: Config,
}

impl<'s> Pipeline<'s> {
    pub fn new(sox: &'s Sox, config: Config) -> Self {
        Self { sox, config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Process the configured input file into the configured output file
    pub fn run(&self) -> Result<FlowReport> {
        self.run_files(None)
    }

    /// Like [`run`](Self::run), reporting progress between buffers
    pub fn run_with_progress<F>(&self, mut progress: F) -> Result<FlowReport>
    where
        F: FnMut(bool) -> FlowControl,
    {
        self.run_files(Some(&mut progress))
    }

    fn run_files(&self, progress: Progress<'_>) -> Result<FlowReport> {
        let start_time = Instant::now();
        let input_cfg = &self.config.input;
        let output_cfg = &self.config.output;

        let mut input = self.sox.open_read(&input_cfg.path, &input_cfg.read_options())?;
        let input_signal = input.signal();
        if self.config.verbose() {
            println!("Input: {} ({})", input.label(), input_signal);
        }

        let processed = self.run_chain(
            &mut input,
            |options| self.sox.open_write(&output_cfg.path, options),
            progress,
        );
        let input_closed = input.close();
        let (summary, output) = processed?;
        let output_signal = output.signal();
        if self.config.verbose() {
            println!("Output: {} ({})", output.label(), output_signal);
        }
        output.close()?;
        input_closed?;

        let report = FlowReport {
            input_path: input_cfg.path.clone(),
            output_path: output_cfg.path.clone(),
            input_signal,
            output_signal,
            summary,
            processing_time: start_time.elapsed(),
        };
        log::info!(
            "Processed {} -> {} in {:.2}s ({} clipped)",
            report.input_path.display(),
            report.output_path.display(),
            report.processing_time.as_secs_f64(),
            report.clips()
        );
        Ok(report)
    }

    /// Decode `bytes` and re-encode them in memory as the configured output
    /// file type.
    pub fn run_bytes(&self, bytes: Vec<u8>) -> Result<Vec<u8>> {
        let mut input = self.sox.open_mem_read(bytes, &self.config.input.read_options())?;
        let processed = self.run_chain(&mut input, |options| self.sox.open_memstream_write(options), None);
        let input_closed = input.close();
        let (_, output) = processed?;
        let encoded = output.into_bytes()?;
        input_closed?;
        Ok(encoded)
    }

    /// Build the chain from `input`, opening the output only once the user
    /// effects have fixed the rate and channel count it receives. Unset
    /// output overrides follow those effects rather than the input.
    fn run_chain<'o, O>(
        &self,
        input: &mut InputStream<'_>,
        open_output: O,
        progress: Progress<'_>,
    ) -> Result<(ChainSummary, OutputStream<'o>)>
    where
        O: FnOnce(&WriteOptions) -> Result<OutputStream<'o>>,
    {
        let output_cfg = &self.config.output;
        let input_signal = input.signal();
        let requested = output_cfg.write_options(&input_signal).signal;
        let provisional = output_cfg.encoding.unwrap_or_else(|| input.encoding());

        // declared first so it outlives the chain borrowing it
        let mut output_slot = None;
        let mut chain = EffectsChain::new(self.sox, &input.encoding(), &provisional)?;
        let mut signal = input_signal;
        chain.add_input(input, &mut signal)?;
        for spec in &self.config.effects {
            self.add_spec(&mut chain, spec, &mut signal, &requested)?;
        }

        let produced = SignalInfo {
            rate: signal.rate,
            channels: signal.channels,
            ..input_signal
        };
        let output = output_slot.insert(open_output(&output_cfg.write_options(&produced))?);
        chain.set_output_encoding(&output.encoding());

        let summary = self.finish_chain(chain, output, signal, progress)?;
        let output = output_slot
            .take()
            .ok_or_else(|| SoxError::operation("Output stream was not opened"))?;
        Ok((ChainSummary { output_clips: output.clips(), ..summary }, output))
    }

    /// Build and flow the chain between two open streams. The chain is
    /// deleted before this returns; the streams stay open.
    pub fn process_streams(
        &self,
        input: &mut InputStream<'_>,
        output: &mut OutputStream<'_>,
        progress: Progress<'_>,
    ) -> Result<ChainSummary> {
        let target = output.signal();
        let mut chain = EffectsChain::new(self.sox, &input.encoding(), &output.encoding())?;
        let mut signal = input.signal();

        chain.add_input(input, &mut signal)?;
        for spec in &self.config.effects {
            self.add_spec(&mut chain, spec, &mut signal, &target)?;
        }
        let summary = self.finish_chain(chain, output, signal, progress)?;
        Ok(ChainSummary { output_clips: output.clips(), ..summary })
    }

    /// Adapt `signal` to the output, add the output and flow. The returned
    /// summary has no output clip count yet.
    fn finish_chain<'a>(
        &self,
        mut chain: EffectsChain<'a>,
        output: &'a mut OutputStream<'_>,
        mut signal: SignalInfo,
        progress: Progress<'_>,
    ) -> Result<ChainSummary> {
        let target = output.signal();
        if self.config.processing.auto_adapt {
            for spec in adaptation_effects(&signal, &target) {
                log::info!("Adapting signal with `{}`", spec);
                self.add_spec(&mut chain, &spec, &mut signal, &target)?;
            }
        }
        // libsox would silently write at the wrong rate or channel count
        if !signal.same_geometry(&target) {
            return Err(SoxError::operation(format!(
                "Chain produces {} but the output expects {}",
                signal, target
            )));
        }
        chain.add_output(output, &mut signal)?;

        let outcome = match progress {
            Some(progress) => chain.flow_with_progress(progress)?,
            None => {
                chain.flow()?;
                FlowOutcome::Completed
            }
        };

        let summary = ChainSummary {
            effects: chain.effect_names().to_vec(),
            outcome,
            effect_clips: chain.clips(),
            output_clips: 0,
        };
        chain.delete();
        Ok(summary)
    }

    fn add_spec(
        &self,
        chain: &mut EffectsChain<'_>,
        spec: &EffectSpec,
        signal: &mut SignalInfo,
        target: &SignalInfo,
    ) -> Result<()> {
        let mut effect = self.sox.effect(&spec.name)?.create()?;
        effect.set_options(&spec.args)?;
        chain.add_effect(effect, signal, target)
    }
}

/// `rate`/`channels` effects needed to turn `current` into `target`.
///
/// Channels are reduced before resampling and added after it, so the
/// resampler handles as few channels as possible.
pub fn adaptation_effects(current: &SignalInfo, target: &SignalInfo) -> Vec<EffectSpec> {
    let rate = (current.rate != target.rate).then(|| EffectSpec::new("rate"));
    let channels = (current.channels != target.channels).then(|| EffectSpec::new("channels"));

    if target.channels < current.channels {
        channels.into_iter().chain(rate).collect()
    } else {
        rate.into_iter().chain(channels).collect()
    }
}
