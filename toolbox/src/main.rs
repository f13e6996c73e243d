use anyhow::{bail, Context};
use clap::{Parser, Subcommand};
use detectcore::gp_interface::{
    attribute_image_detections_descriptor, space_time_correlation_descriptor, toolbox_descriptor,
    ParameterValues,
};
use detectcore::processing::{AttributeImageParams, SpaceTimeParams};
use detectcore::ToolEnvironment;
use generator::scenario::{build_scenario, ScenarioConfig};
use std::path::{Path, PathBuf};
use workflow::config::{ToolRun, WorkflowConfig};
use workflow::report::append_report;
use workflow::runner::Runner;

mod generator;
mod workflow;

#[derive(Parser)]
#[command(author, version, about = "Object detection geoprocessing tools")]
struct Args {
    /// Append one summary line per tool run to this file
    #[arg(long, global = true)]
    report: Option<PathBuf>,
    /// Folder for intermediate outputs
    #[arg(long, global = true)]
    scratch: Option<PathBuf>,
    /// Allow existing outputs to be replaced
    #[arg(long, global = true, default_value_t = false)]
    overwrite: bool,
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Clip an image chip for every detection and store it on the feature
    AttachImages {
        #[arg(long)]
        detections: PathBuf,
        #[arg(long)]
        image: PathBuf,
        /// Store chips in a BLOB field instead of as attachments
        #[arg(long, default_value_t = false)]
        blob: bool,
        /// Write a copy instead of updating the detections in place
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// Join tracks that pass a detection in space and time onto it
    Correlate {
        #[arg(long)]
        detections: PathBuf,
        #[arg(long)]
        detection_id_field: Option<String>,
        #[arg(long)]
        detection_time_field: String,
        #[arg(long)]
        tracks: PathBuf,
        #[arg(long)]
        track_id_field: String,
        #[arg(long)]
        track_time_field: String,
        #[arg(long)]
        output: PathBuf,
        /// Metres in Web Mercator
        #[arg(long, default_value_t = 800)]
        distance_tolerance: i64,
        /// bracketing, proximity or window
        #[arg(long)]
        temporal_mode: Option<String>,
        #[arg(long)]
        time_window_secs: Option<f64>,
    },
    /// Print the toolbox, or one tool, as JSON
    Describe { tool: Option<String> },
    /// Run the tools listed in a YAML workflow file
    Run {
        #[arg(long)]
        workflow: PathBuf,
    },
    /// Write a synthetic detection scene
    Generate {
        #[arg(long)]
        out_dir: PathBuf,
        #[arg(long)]
        seed: Option<u64>,
        #[arg(long)]
        detections: Option<usize>,
        #[arg(long)]
        tracks: Option<usize>,
    },
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}

fn environment(args: &Args) -> ToolEnvironment {
    let mut env = ToolEnvironment::default();
    if let Some(scratch) = &args.scratch {
        env.scratch_folder = scratch.clone();
    }
    env.overwrite_output = args.overwrite;
    env
}

fn run_workflow(config: WorkflowConfig) -> anyhow::Result<()> {
    let report = config.report.clone();
    let results = Runner::new(config).execute()?;
    for result in &results {
        println!("{}", result.summary_line());
        for warning in result.warnings() {
            println!("  warning: {}", warning);
        }
    }
    if let Some(path) = report {
        append_report(&path, &results)?;
    }
    Ok(())
}

fn main() -> anyhow::Result<()> {
    env_logger::init();
    let args = Args::parse();
    let env = environment(&args);

    match &args.command {
        Command::AttachImages {
            detections,
            image,
            blob,
            output,
        } => {
            let mut values = ParameterValues::new();
            values
                .set("detectionFC", path_value(detections))
                .set("sourceImage", path_value(image))
                .set("storeAsBlob", *blob)
                .set_opt("outputFeatures", output.as_deref().map(path_value));
            let values = attribute_image_detections_descriptor()
                .validate(values)
                .context("validating AttributeImageDetections parameters")?;
            let params = AttributeImageParams::try_from(&values)?;
            run_workflow(WorkflowConfig::single(
                env,
                ToolRun::AttributeImageDetections(params),
                args.report.clone(),
            ))
        }
        Command::Correlate {
            detections,
            detection_id_field,
            detection_time_field,
            tracks,
            track_id_field,
            track_time_field,
            output,
            distance_tolerance,
            temporal_mode,
            time_window_secs,
        } => {
            let mut values = ParameterValues::new();
            values
                .set("detectionFC", path_value(detections))
                .set_opt("detectionIDField", detection_id_field.clone())
                .set("detectionTimeField", detection_time_field.as_str())
                .set("tracksFC", path_value(tracks))
                .set("trackIDField", track_id_field.as_str())
                .set("trackTimeField", track_time_field.as_str())
                .set("outputFeatures", path_value(output))
                .set("distanceTolerance", *distance_tolerance)
                .set_opt("temporalMode", temporal_mode.clone())
                .set_opt("timeWindowSecs", *time_window_secs);
            let values = space_time_correlation_descriptor()
                .validate(values)
                .context("validating SpaceTimeCorrelation parameters")?;
            let params = SpaceTimeParams::try_from(&values)?;
            run_workflow(WorkflowConfig::single(
                env,
                ToolRun::SpaceTimeCorrelation(params),
                args.report.clone(),
            ))
        }
        Command::Describe { tool } => {
            let toolbox = toolbox_descriptor();
            let text = match tool {
                Some(name) => match toolbox.tool(name) {
                    Some(descriptor) => serde_json::to_string_pretty(descriptor)?,
                    None => bail!("unknown tool '{}'", name),
                },
                None => serde_json::to_string_pretty(&toolbox)?,
            };
            println!("{}", text);
            Ok(())
        }
        Command::Run { workflow } => {
            let mut config = WorkflowConfig::load(workflow)?;
            if config.report.is_none() {
                config.report = args.report.clone();
            }
            run_workflow(config)
        }
        Command::Generate {
            out_dir,
            seed,
            detections,
            tracks,
        } => {
            let mut config = ScenarioConfig::default();
            if let Some(seed) = seed {
                config.seed = *seed;
            }
            if let Some(detections) = detections {
                config.detections = *detections;
            }
            config.tracks = (*tracks).unwrap_or(config.detections + 2);
            let files = build_scenario(&config, out_dir)?;
            println!(
                "Scenario -> detections {}, tracks {}, image {}",
                files.detections.display(),
                files.tracks.display(),
                files.image.display()
            );
            Ok(())
        }
    }
}
