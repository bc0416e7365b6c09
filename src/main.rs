use clap::Parser;
use solar_rooftop::coordinator::{AnalysisMethod, Assessment, CoordinatorBuilder};
use solar_rooftop::enhancement::VisionModel;
use solar_rooftop::error::AppError;
use solar_rooftop::finance::format_inr;
use solar_rooftop::report::Report;
use solar_rooftop::{RoofImage, Settings};
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info, Level};

/// Estimate rooftop solar potential from a single photo.
#[derive(Debug, Parser)]
#[command(name = "solar-rooftop", version)]
struct Args {
    /// Rooftop photo (PNG or JPEG).
    image: PathBuf,

    /// Vision model used to enhance the analysis.
    #[arg(long)]
    model: Option<VisionModel>,

    /// Largest system to recommend, in kW (1-20).
    #[arg(long)]
    max_kw: Option<f64>,

    /// Skip the vision model and report the CV analysis only.
    #[arg(long)]
    no_ai: bool,

    /// Write a JSON report into this directory.
    #[arg(long, value_name = "DIR")]
    report: Option<PathBuf>,

    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[arg(short, long)]
    verbose: bool,
}

fn init_logging(verbose: bool) {
    let level = if verbose { Level::DEBUG } else { Level::INFO };
    tracing_subscriber::fmt().with_max_level(level).init();
}

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    init_logging(args.verbose);

    match run(args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!(error = %e, "analysis failed");
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> Result<(), AppError> {
    let mut settings = Settings::load(args.config.as_deref())?;
    if let Some(max_kw) = args.max_kw {
        settings = settings.with_max_system_kw(max_kw);
    }
    if let Some(model) = args.model {
        settings = settings.with_model(model);
    }
    if args.no_ai {
        settings = settings.without_enhancement();
    }

    let bytes = tokio::fs::read(&args.image).await?;
    let image = RoofImage::decode(bytes)?;
    info!(path = %args.image.display(), image_id = %image.id(), "image loaded");

    let mut coordinator = CoordinatorBuilder::new(settings).build()?;
    let assessment = coordinator.assess(image).await?;

    print_assessment(&assessment);

    if let Some(dir) = args.report {
        let path = Report::new(&assessment).write_to(&dir)?;
        println!("\nReport written to {}", path.display());
    }

    Ok(())
}

fn print_assessment(assessment: &Assessment) {
    let analysis = &assessment.analysis;
    let base = analysis.base();
    let metrics = &assessment.metrics;

    println!("=== Solar Rooftop Analysis ===");
    println!("Roof condition:    {}", analysis.roof_condition().title());
    println!("Usable area:       {}%", analysis.usable_area_percent());
    println!("System size:       {:.1} kW", assessment.system_kw);
    println!("Confidence:        {}%", analysis.confidence());
    println!(
        "Analysis time:     {:.2}s",
        assessment.total_time.as_secs_f64()
    );
    match assessment.method {
        AnalysisMethod::CvWithAi => println!(
            "Method:            {} ({})",
            assessment.method.label(),
            assessment.model.display_name()
        ),
        AnalysisMethod::CvOnly => println!("Method:            {}", assessment.method.label()),
    }
    if let Some(shading) = analysis.shading_assessment() {
        println!("Shading:           {shading}");
    }
    if let Some(orientation) = analysis.roof_orientation() {
        println!("Orientation:       {orientation}");
    }
    println!("{}", base.notes);

    println!("\n--- Technical details ---");
    println!("Image size:        {}", base.image_size);
    println!("Brightness:        {:.1}", base.image_metrics.brightness);
    println!("Contrast:          {:.1}", base.image_metrics.contrast);
    println!("Sharpness:         {:.1}", base.image_metrics.sharpness);
    println!("Est. roof area:    {:.1} m²", base.image_metrics.roof_area_m2);

    println!("\n--- Financial breakdown ---");
    println!("Panels:            {}", metrics.panels);
    println!("Annual generation: {} kWh", metrics.annual_kwh);
    println!("Gross cost:        {}", format_inr(metrics.gross_cost));
    println!("Subsidy:           {}", format_inr(metrics.subsidy()));
    println!("Net cost:          {}", format_inr(metrics.net_cost));
    println!("Annual savings:    {}", format_inr(metrics.annual_savings));
    println!("Payback:           {:.1} years", metrics.payback_years);
    println!(
        "{:<19}{}",
        format!("{}:", metrics.lifetime_label()),
        format_inr(metrics.lifetime_savings)
    );
    println!("ROI:               {}%", metrics.roi_percent());
    println!("CO2 offset:        {:.1} t/year", metrics.co2_offset);

    println!("\n{}", assessment.recommendation());
}
