use anyhow::{bail, Context};
use clap::Parser;
use sampleforge::harness::{default_scenarios, DriverConfig, EquivalenceDriver, Scenario, SuiteReport};
use sampleforge::logging::{init_with_config, LoggingConfig};
use sampleforge::operator::{Device, HostRandomSample, RandomSampleOperator};
use sampleforge::sampler::SamplingConfig;
use sampleforge::tensor::DataType;

#[derive(Parser, Debug)]
#[command(name = "sampleforge-check", version)]
#[command(about = "Check a random-sample operator against the reference sampler", long_about = None)]
struct Cli {
    /// Log both indices and scores for every scenario
    #[arg(long)]
    debug: bool,

    /// Time reference and operator after each check
    #[arg(long)]
    profile: bool,

    /// Untimed warm-up calls per profiled path
    #[arg(long)]
    num_prerun: Option<usize>,

    /// Timed calls per profiled path
    #[arg(long)]
    num_iterations: Option<usize>,

    /// Base seed for score permutations
    #[arg(long)]
    seed: Option<u64>,

    /// Score element type: f16, bf16, f32 or f64
    #[arg(long)]
    dtype: Option<DataType>,

    /// Run a single custom scenario with this vocabulary size
    #[arg(long)]
    voc: Option<usize>,

    #[arg(long, requires = "voc")]
    random_val: Option<f32>,

    #[arg(long, requires = "voc")]
    topp: Option<f32>,

    #[arg(long, requires = "voc")]
    topk: Option<i32>,

    #[arg(long, requires = "voc")]
    temperature: Option<f32>,

    /// Use the linked C operator library instead of the host operator
    #[arg(long)]
    ffi: bool,

    /// Device family the operator library targets
    #[arg(long, default_value = "cpu")]
    device: Device,

    /// Device id passed to the operator library
    #[arg(long, default_value_t = 0)]
    device_id: i32,

    /// Print the suite report as JSON
    #[arg(long)]
    json: bool,
}

impl Cli {
    fn driver_config(&self) -> anyhow::Result<DriverConfig> {
        let mut config = DriverConfig::from_env().context("reading SAMPLEFORGE_* settings")?;
        if self.debug {
            config = config.with_debug(true);
        }
        if self.profile {
            config = config.with_profile(true);
        }
        if let Some(n) = self.num_prerun {
            config = config.with_num_prerun(n);
        }
        if let Some(n) = self.num_iterations {
            config = config.with_num_iterations(n);
        }
        if let Some(seed) = self.seed {
            config = config.with_seed(seed);
        }
        if let Some(dtype) = self.dtype {
            config = config.with_dtype(dtype);
        }
        config.validate()?;
        Ok(config)
    }

    fn scenarios(&self) -> Vec<Scenario> {
        match self.voc {
            Some(voc) => {
                let defaults = SamplingConfig::default();
                vec![Scenario::new(
                    voc,
                    self.random_val.unwrap_or(defaults.random_val),
                    self.topp.unwrap_or(defaults.topp),
                    self.topk.unwrap_or(defaults.topk),
                    self.temperature.unwrap_or(defaults.temperature),
                )]
            }
            None => default_scenarios(),
        }
    }
}

fn run<O: RandomSampleOperator>(
    operator: O,
    config: DriverConfig,
    scenarios: &[Scenario],
) -> SuiteReport {
    let mut driver = EquivalenceDriver::new(operator, config);
    driver.run_suite(scenarios)
}

#[cfg(feature = "ffi")]
fn run_ffi(cli: &Cli, config: DriverConfig, scenarios: &[Scenario]) -> anyhow::Result<SuiteReport> {
    use sampleforge::operator::ffi::FfiRandomSample;

    let operator = FfiRandomSample::new(cli.device, cli.device_id).map_err(|status| {
        anyhow::anyhow!("failed to open operator library on {}: {}", cli.device, status)
    })?;
    Ok(run(operator, config, scenarios))
}

#[cfg(not(feature = "ffi"))]
fn run_ffi(_cli: &Cli, _config: DriverConfig, _scenarios: &[Scenario]) -> anyhow::Result<SuiteReport> {
    bail!("--ffi requires a build with the `ffi` feature")
}

fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    let logging = LoggingConfig::from_env().context("reading SAMPLEFORGE_LOG_* settings")?;
    init_with_config(&logging)?;

    let config = cli.driver_config()?;
    let scenarios = cli.scenarios();

    let report = if cli.ffi {
        run_ffi(&cli, config, &scenarios)?
    } else {
        if cli.device != Device::Cpu {
            bail!("the host operator only runs on cpu; pass --ffi for {}", cli.device);
        }
        run(HostRandomSample::new(), config, &scenarios)
    };

    if cli.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else {
        println!("{}", report);
    }

    if !report.all_passed() {
        bail!("{} of {} scenarios failed", report.failed(), report.outcomes.len());
    }
    Ok(())
}
