use std::io::{Write, BufWriter, BufReader, stdin};
use std::path::Path;
use fs_err::File;
use indicatif::{ProgressBar, ProgressStyle};
use serde::{Serialize, de::DeserializeOwned};

pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const GIT_HASH: &str = env!("GIT_HASH");
pub const BUILD_TIME: &str = env!("BUILD_TIME_CHRONO");

/// Provenance header of every table we write, readers skip lines starting with `#`
pub fn write_commands_and_version<W: Write>(mut w: W) -> std::io::Result<()>
{
    writeln!(w, "# {VERSION} {} built {BUILD_TIME}", GIT_HASH.trim())?;
    write!(w, "#")?;
    for arg in std::env::args()
    {
        write!(w, " {arg}")?;
    }
    writeln!(w)
}

pub fn indication_bar(len: u64, quiet: bool) -> ProgressBar
{
    if quiet {
        return ProgressBar::hidden();
    }
    // for indication on when it is finished
    let bar = ProgressBar::new(len);
    let style = ProgressStyle::default_bar()
        .template("{msg} [{elapsed_precise} - {eta_precise}] {wide_bar} {pos}/{len}")
        .unwrap_or_else(|_| ProgressStyle::default_bar());
    bar.set_style(style);
    bar
}

pub fn create_buf<P>(path: P) -> std::io::Result<BufWriter<File>>
where P: AsRef<Path>
{
    let file = File::create(path.as_ref())?;
    Ok(BufWriter::new(file))
}

pub fn open_bufreader<P>(path: P) -> std::io::Result<BufReader<File>>
where P: AsRef<Path>
{
    let file = File::open(path.as_ref())?;
    Ok(BufReader::new(file))
}

pub fn create_buf_with_command_and_version<P>(path: P) -> std::io::Result<BufWriter<File>>
where P: AsRef<Path>
{
    let mut buf = create_buf(path)?;
    write_commands_and_version(&mut buf)?;
    Ok(buf)
}

/// Reads a json file. If it does not exist, offers to create it with default values
/// and exits afterwards, so the user can edit it first.
pub fn read_or_create<T, P>(path: P) -> anyhow::Result<T>
where P: AsRef<Path>,
    T: DeserializeOwned + Default + Serialize
{
    let p = path.as_ref();
    match File::open(p)
    {
        Err(e) => {
            eprintln!("While opening job file encountered {e}");
            let handle = stdin();
            let mut line = String::new();
            let create_file = loop{
                line.clear();
                println!("Do you wish to create the job file? y/n");
                if handle.read_line(&mut line)? == 0 {
                    break false;
                }
                let l = line.trim_end();
                match l
                {
                    "y" | "Y" | "yes" | "Yes" => {
                        break true;
                    },
                    "n" | "N" | "no" | "No" => {
                        break false;
                    },
                    otherwise => {
                        println!("Unrecognized: {otherwise}");
                    }
                }
            };
            if create_file{
                write_default_json::<T, _>(p)?;
                println!("Created {p:?}");
            }
            std::process::exit(0);
        },
        Ok(file) => {
            let buf = BufReader::new(file);
            let job = serde_json::from_reader(buf)?;
            Ok(job)
        }
    }
}

pub fn write_default_json<T, P>(path: P) -> anyhow::Result<()>
where P: AsRef<Path>,
    T: Default + Serialize
{
    let mut buf = create_buf(path)?;
    serde_json::to_writer_pretty(&mut buf, &T::default())?;
    buf.flush()?;
    Ok(())
}
