//! Command-line driver for the snowp compiler.
//!
//! Builds the set of input/output file pairs from the options (a single
//! pair, or every matching file in a directory), then compiles each pair
//! independently: read, parse, emit. The first failure aborts the run.

use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};

use snowpc::ast::Language;
use snowpc::emit::{GoEmitter, Metadata};
use structopt::StructOpt;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error("{0}")]
    Config(String),
    #[error(transparent)]
    Compile(#[from] snowpc::Error),
    #[error(transparent)]
    Io(#[from] io::Error),
}

fn config_err(msg: impl Into<String>) -> CliError {
    CliError::Config(msg.into())
}

#[derive(Debug, StructOpt)]
#[structopt(name = "snowpc", about = "Compile .snowp schema and RPC definitions")]
pub struct Options {
    /// Output language
    #[structopt(short = "l", long = "lang", default_value = "go")]
    pub lang: String,
    /// Input file; defaults to standard input
    #[structopt(short = "i", long = "infile")]
    pub infile: Option<String>,
    /// Output file; defaults to standard output
    #[structopt(short = "o", long = "outfile")]
    pub outfile: Option<String>,
    /// Input directory; compiles every matching file in it
    #[structopt(short = "I", long = "input-dir")]
    pub indir: Option<PathBuf>,
    /// Output directory; required with --input-dir
    #[structopt(short = "O", long = "output-dir")]
    pub outdir: Option<PathBuf>,
    /// Package name for generated code
    #[structopt(short = "p", long = "package")]
    pub package: Option<String>,
    /// Input file extension
    #[structopt(short = "e", long = "ext", default_value = "snowp")]
    pub ext: String,
    /// Verbose output
    #[structopt(short = "v", long = "verbose")]
    pub verbose: bool,
}

/// The validated form of [`Options`].
#[derive(Debug)]
pub struct Config {
    pub lang: Language,
    pub infile: String,
    pub outfile: String,
    pub indir: Option<PathBuf>,
    pub outdir: Option<PathBuf>,
    pub package: String,
    pub ext: String,
    pub verbose: bool,
}

fn is_dir(d: &Path) -> bool {
    fs::metadata(d).map(|m| m.is_dir()).unwrap_or(false)
}

impl Options {
    pub fn check(self) -> Result<Config, CliError> {
        let lang = match self.lang.as_str() {
            "go" => Language::Go,
            "ts" => Language::TypeScript,
            other => return Err(config_err(format!("unsupported language: {}", other))),
        };

        if self.indir.is_some() != self.outdir.is_some() {
            return Err(config_err(
                "must specify output directory with input directory",
            ));
        }
        if (self.indir.is_some() || self.outdir.is_some())
            && (self.infile.is_some() || self.outfile.is_some())
        {
            return Err(config_err(
                "cannot use input or output file with input directory",
            ));
        }

        if let Some(indir) = &self.indir {
            if !is_dir(indir) {
                return Err(config_err(format!(
                    "input directory {} does not exist",
                    indir.display()
                )));
            }
        }
        if let Some(outdir) = &self.outdir {
            if !is_dir(outdir) {
                return Err(config_err(format!(
                    "output directory {} does not exist",
                    outdir.display()
                )));
            }
        }

        let package = match self.package {
            Some(p) if !p.is_empty() => p,
            _ => return Err(config_err("must specify package name")),
        };

        let mut ext = self.ext;
        if ext.is_empty() {
            ext = "snowp".to_owned();
        }
        let ext = ext.trim_start_matches('.').to_owned();

        Ok(Config {
            lang,
            infile: self.infile.unwrap_or_else(|| "-".to_owned()),
            outfile: self.outfile.unwrap_or_else(|| "-".to_owned()),
            indir: self.indir,
            outdir: self.outdir,
            package,
            ext,
            verbose: self.verbose,
        })
    }
}

#[derive(Debug)]
pub struct Infile {
    name: String,
}

impl Infile {
    fn is_std_pipe(&self) -> bool {
        self.name.is_empty() || self.name == "-"
    }

    pub fn name(&self) -> &str {
        if self.is_std_pipe() {
            "<stdin>"
        } else {
            &self.name
        }
    }

    pub fn read(&self) -> io::Result<String> {
        if self.is_std_pipe() {
            let mut buf = String::new();
            io::stdin().read_to_string(&mut buf)?;
            Ok(buf)
        } else {
            fs::read_to_string(&self.name)
        }
    }
}

#[derive(Debug)]
pub struct Outfile {
    name: String,
}

impl Outfile {
    fn is_std_pipe(&self) -> bool {
        self.name.is_empty() || self.name == "-"
    }

    pub fn name(&self) -> &str {
        if self.is_std_pipe() {
            "<stdout>"
        } else {
            &self.name
        }
    }

    /// The writer is dropped, and with it closed, on every exit path of
    /// the per-file compile.
    pub fn writer(&self) -> io::Result<Box<dyn Write>> {
        if self.is_std_pipe() {
            Ok(Box::new(io::stdout()))
        } else {
            Ok(Box::new(fs::File::create(&self.name)?))
        }
    }
}

#[derive(Debug)]
pub struct FilePair {
    pub infile: Infile,
    pub outfile: Outfile,
}

#[derive(Debug, Default)]
pub struct FileSet {
    pub files: Vec<FilePair>,
}

impl FileSet {
    pub fn build(cfg: &Config) -> Result<FileSet, CliError> {
        let mut set = FileSet::default();
        match (&cfg.indir, &cfg.outdir) {
            (Some(indir), Some(outdir)) => set.build_from_dir(cfg, indir, outdir)?,
            _ => set.files.push(FilePair {
                infile: Infile {
                    name: cfg.infile.clone(),
                },
                outfile: Outfile {
                    name: cfg.outfile.clone(),
                },
            }),
        }
        Ok(set)
    }

    fn build_from_dir(&mut self, cfg: &Config, indir: &Path, outdir: &Path) -> Result<(), CliError> {
        let mut names = Vec::new();
        for ent in fs::read_dir(indir)? {
            let ent = ent?;
            if ent.file_type()?.is_dir() {
                continue;
            }
            let path = ent.path();
            if path.extension().and_then(|e| e.to_str()) != Some(cfg.ext.as_str()) {
                continue;
            }
            names.push(path);
        }
        // Directory order is platform-dependent; keep output deterministic.
        names.sort();
        for path in names {
            let stem = match path.file_stem().and_then(|s| s.to_str()) {
                Some(stem) => stem,
                None => continue,
            };
            let outfile = outdir.join(format!("{}.{}", stem, cfg.lang.out_ext()));
            self.files.push(FilePair {
                infile: Infile {
                    name: path.to_string_lossy().into_owned(),
                },
                outfile: Outfile {
                    name: outfile.to_string_lossy().into_owned(),
                },
            });
        }
        Ok(())
    }
}

fn compile_one(fp: &FilePair, cfg: &Config) -> Result<(), CliError> {
    if cfg.verbose && !fp.infile.is_std_pipe() && !fp.outfile.is_std_pipe() {
        eprintln!("🏗️  {} → {}", fp.infile.name(), fp.outfile.name());
    }
    let indat = fp.infile.read()?;
    let root = snowpc::parse(&indat, fp.infile.name())?;
    if cfg.lang != Language::Go {
        return Err(config_err(
            "only the go target language is currently supported",
        ));
    }
    let out = fp.outfile.writer()?;
    let md = Metadata {
        package: cfg.package.clone(),
        input_name: fp.infile.name().to_owned(),
    };
    let mut emitter = GoEmitter::new(md, out);
    emitter.emit(&root);
    Ok(())
}

pub fn run(opts: Options) -> Result<(), CliError> {
    let cfg = opts.check()?;
    let fs = FileSet::build(&cfg)?;
    for fp in &fs.files {
        compile_one(fp, &cfg)?;
    }
    Ok(())
}
