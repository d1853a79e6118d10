mod config;

use {
    animate::{
        contact_states, contact_timings, render_posture, write_bvh, BvhLoader,
        Loader, Motion, PoseRenderer, Transform, Vec3,
    },
    clap::{Parser, Subcommand},
    color_eyre::Report,
    config::Config,
    eyre::WrapErr,
    std::{
        fs::File,
        io::BufWriter,
        path::{Path, PathBuf},
    },
    tracing_error::ErrorLayer,
    tracing_subscriber::{fmt, layer::SubscriberExt as _, EnvFilter, Registry},
};

/// Inspect and edit BVH motion capture files.
#[derive(Parser)]
#[command(name = "mocap")]
struct Cli {
    /// Config file to use instead of `MOCAP_CONFIG_PATH` or `./mocap.ron`.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Multiplier for offsets and root translation.
    #[arg(long, global = true)]
    scale: Option<f64>,

    /// Keep the root joint offset.
    #[arg(long, global = true)]
    apply_root_offset: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Print skeleton hierarchy, frame count and rest positions.
    Info { file: PathBuf },

    /// Print joint velocity, at one frame or at every frame.
    Velocity {
        file: PathBuf,
        joint: String,

        #[arg(long)]
        frame: Option<usize>,

        /// Print acceleration as well.
        #[arg(long)]
        acceleration: bool,
    },

    /// Detect ground contacts of a joint.
    Contacts {
        file: PathBuf,
        joint: String,

        #[arg(long)]
        height_ref: Option<f64>,

        #[arg(long)]
        speed_ref: Option<f64>,
    },

    /// Move a joint to a world position with two-bone IK.
    Ik {
        file: PathBuf,
        joint: String,

        #[arg(allow_negative_numbers = true)]
        x: f64,

        #[arg(allow_negative_numbers = true)]
        y: f64,

        #[arg(allow_negative_numbers = true)]
        z: f64,

        #[arg(long, default_value_t = 0)]
        frame: usize,

        /// Bend axis in the parent joint frame.
        #[arg(
            long,
            num_args = 3,
            value_names = ["X", "Y", "Z"],
            allow_negative_numbers = true
        )]
        axis: Option<Vec<f64>>,

        /// Write the edited motion here.
        #[arg(long)]
        output: Option<PathBuf>,
    },

    /// Write a frame range as BVH.
    Export {
        file: PathBuf,
        out: PathBuf,

        #[arg(long)]
        from: Option<usize>,

        #[arg(long)]
        to: Option<usize>,
    },
}

fn main() -> Result<(), Report> {
    color_eyre::install()?;
    let cli = Cli::parse();

    let mut config = match &cli.config {
        Some(path) => Config::load(path)?,
        None => Config::load_default()?,
    };
    if let Some(scale) = cli.scale {
        config.scale = scale;
    }
    if cli.apply_root_offset {
        config.apply_root_offset = true;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(&config.log_filter));
    let subscriber = Registry::default()
        .with(filter)
        .with(fmt::layer())
        .with(ErrorLayer::default());
    tracing::subscriber::set_global_default(subscriber)?;

    match cli.command {
        Command::Info { file } => info(&load(&file, &config)?),
        Command::Velocity {
            file,
            joint,
            frame,
            acceleration,
        } => velocity(&load(&file, &config)?, &joint, frame, acceleration),
        Command::Contacts {
            file,
            joint,
            height_ref,
            speed_ref,
        } => {
            let mut thresholds = config.contact;
            if let Some(height_ref) = height_ref {
                thresholds.height_ref = height_ref;
            }
            if let Some(speed_ref) = speed_ref {
                thresholds.speed_ref = speed_ref;
            }

            let motion = load(&file, &config)?;
            let states = contact_states(&motion, joint.as_str(), &thresholds)?;
            let (starts, ends) = contact_timings(&states);
            println!(
                "{} of {} frames in contact",
                states.iter().filter(|&&s| s).count(),
                states.len()
            );
            println!("starts: {:?}", starts);
            println!("ends: {:?}", ends);
            Ok(())
        }
        Command::Ik {
            file,
            joint,
            x,
            y,
            z,
            frame,
            axis,
            output,
        } => {
            let mut motion = load(&file, &config)?;
            let axis = axis.map(|a| Vec3::new(a[0], a[1], a[2]));
            let target = Vec3::new(x, y, z);

            let posture = ik::solve(
                motion.get_mut(frame)?,
                joint.as_str(),
                target,
                axis,
            )
            .wrap_err_with(|| format!("Failed to move `{}`", joint))?;

            let index = posture.skeleton().index_by_label(&joint)?;
            let reached = posture.global_position(index);
            println!(
                "`{}` at frame {} moved to {:?}, error {:.6}",
                joint,
                frame,
                reached,
                (reached - target).norm()
            );

            if let Some(output) = output {
                save(&motion, &output)?;
            }
            Ok(())
        }
        Command::Export {
            file,
            out,
            from,
            to,
        } => {
            let motion = load(&file, &config)?;
            let range = from.unwrap_or(0)..to.unwrap_or_else(|| motion.len());
            let slice = motion.slice(range)?;
            save(&slice, &out)
        }
    }
}

fn load(file: &Path, config: &Config) -> Result<Motion, Report> {
    let loader = BvhLoader {
        scale: config.scale,
        apply_root_offset: config.apply_root_offset,
    };
    loader.load_path(file).wrap_err_with(|| {
        format!("Failed to load motion from `{}`", file.display())
    })
}

fn save(motion: &Motion, path: &Path) -> Result<(), Report> {
    let file = File::create(path)
        .wrap_err_with(|| format!("Failed to create `{}`", path.display()))?;
    write_bvh(motion, &mut BufWriter::new(file))
        .wrap_err_with(|| format!("Failed to write `{}`", path.display()))?;
    tracing::info!("Wrote {} frames to `{}`", motion.len(), path.display());
    Ok(())
}

fn info(motion: &Motion) -> Result<(), Report> {
    println!("{}", motion.name());
    println!("{} frames at {} fps", motion.len(), motion.fps());
    print!("{}", motion.skeleton());

    if let Ok(posture) = motion.get(0) {
        println!("first frame:");
        render_posture(posture, &mut Printer);
    }
    Ok(())
}

fn velocity(
    motion: &Motion,
    joint: &str,
    frame: Option<usize>,
    acceleration: bool,
) -> Result<(), Report> {
    let frames = match frame {
        Some(frame) => frame..frame + 1,
        None => 0..motion.len(),
    };

    for frame in frames {
        let v = motion.velocity(joint, frame, None)?;
        if acceleration {
            let a = motion.acceleration(joint, frame, None)?;
            println!("{:>5} velocity {:?} acceleration {:?}", frame, v, a);
        } else {
            println!("{:>5} velocity {:?}", frame, v);
        }
    }
    Ok(())
}

/// Prints joint positions and ignores bones.
struct Printer;

impl PoseRenderer for Printer {
    fn joint(&mut self, index: usize, label: &str, transform: &Transform) {
        let p = transform.translation.vector;
        println!(
            "{:>4} {:<24} {:>10.4} {:>10.4} {:>10.4}",
            index, label, p.x, p.y, p.z
        );
    }

    fn bone(&mut self, _parent: Vec3, _child: Vec3) {}
}
