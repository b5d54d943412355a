use clap::{Parser, Subcommand};
use std::fs;
use std::io::{self, IsTerminal, Read};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::time::Instant;
use tracing_subscriber::EnvFilter;
use upc::ast::nodes_to_json;
use upc::generate::{RUNTIME_FILE_NAME, mangle, runtime_support};
use upc::routes::{Resolution, Router};
use upc::{CompileError, GenerateOptions, GenerateResult, Pipeline, RouteRole};
use walkdir::WalkDir;

const LOG_ENV: &str = "UPC_LOG";

#[derive(Parser)]
#[command(name = "upc")]
#[command(about = "upc - HTML templates with embedded Go, compiled to net/http handlers")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Compile every .up file under a directory
    Build {
        /// Pages root
        dir: PathBuf,

        /// Output directory for the generated Go files
        #[arg(long, default_value = "build")]
        out: PathBuf,

        /// Go package name of the generated files
        #[arg(long, default_value = "build")]
        package: String,

        /// Omit //line directives
        #[arg(long)]
        no_line_directives: bool,
    },

    /// Print the Go generated from one .up file
    Generate {
        /// Path to .up file
        #[arg(required_unless_present = "stdin")]
        file: Option<PathBuf>,

        /// Read from stdin
        #[arg(long)]
        stdin: bool,

        /// Output as JSON with source mappings and routes
        #[arg(long)]
        json: bool,

        /// Go package name
        #[arg(long, default_value = "build")]
        package: String,
    },

    /// Print the AST of one .up file as JSON
    Ast {
        file: PathBuf,

        /// Skip literal coalescing
        #[arg(long)]
        raw: bool,
    },

    /// List the routes of every page under a directory
    Routes {
        dir: PathBuf,

        /// Resolve a request path against the routes
        #[arg(long = "match", value_name = "PATH")]
        match_path: Option<String>,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(io::stderr)
        .init();

    let cli = Cli::parse();

    let ok = match cli.command {
        Commands::Build {
            dir,
            out,
            package,
            no_line_directives,
        } => build_directory(&dir, &out, &package, !no_line_directives),
        Commands::Generate {
            file,
            stdin,
            json,
            package,
        } => generate(file.as_deref(), stdin, json, &package),
        Commands::Ast { file, raw } => print_ast(&file, raw),
        Commands::Routes { dir, match_path } => list_routes(&dir, match_path.as_deref()),
    };

    if ok { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn build_directory(dir: &Path, out: &Path, package: &str, line_directives: bool) -> bool {
    let start = Instant::now();
    let files = template_files(dir);
    if files.is_empty() {
        eprintln!("No .up files found in {}", dir.display());
        return false;
    }

    if let Err(err) = fs::create_dir_all(out) {
        report(&CompileError::io(out, err), "", "");
        return false;
    }

    let mut pipeline = Pipeline::standard();
    let mut compiled = 0;
    let mut failed = 0;

    for path in &files {
        let rel = relative_path(dir, path);
        let options = GenerateOptions {
            package_name: package.to_string(),
            source_path: rel.clone(),
            line_directives,
        };
        let source = match fs::read_to_string(path) {
            Ok(source) => source,
            Err(err) => {
                report(&CompileError::io(path, err), "", &rel);
                failed += 1;
                continue;
            }
        };

        let result = match pipeline.compile(&source, &options) {
            Ok(result) => result,
            Err(err) => {
                report(&err, &source, &rel);
                failed += 1;
                continue;
            }
        };

        let stem = rel.strip_suffix(".up").unwrap_or(&rel);
        let output = out.join(format!("{}.up.go", mangle(stem)));
        match fs::write(&output, &result.code) {
            Ok(()) => {
                print_generated(&output.display().to_string());
                compiled += 1;
            }
            Err(err) => {
                report(&CompileError::io(&output, err), "", &rel);
                failed += 1;
            }
        }
    }

    let runtime = out.join(RUNTIME_FILE_NAME);
    if let Err(err) = fs::write(&runtime, runtime_support(package)) {
        report(&CompileError::io(&runtime, err), "", "");
        return false;
    }
    print_generated(&runtime.display().to_string());

    print_summary(compiled, failed, start.elapsed());
    failed == 0
}

fn generate(file: Option<&Path>, stdin: bool, json: bool, package: &str) -> bool {
    let (source, name) = if stdin {
        let mut source = String::new();
        if let Err(err) = io::stdin().read_to_string(&mut source) {
            report(&CompileError::io("<stdin>", err), "", "");
            return false;
        }
        (source, GenerateOptions::default().source_path)
    } else if let Some(path) = file {
        match read_template(path) {
            Some(read) => read,
            None => return false,
        }
    } else {
        eprintln!("Error: provide a file or use --stdin");
        return false;
    };

    let options = GenerateOptions {
        package_name: package.to_string(),
        source_path: name.clone(),
        ..GenerateOptions::default()
    };

    match Pipeline::standard().compile(&source, &options) {
        Ok(result) => print_result(&result, json),
        Err(err) => {
            report(&err, &source, &name);
            false
        }
    }
}

fn print_result(result: &GenerateResult, json: bool) -> bool {
    if !json {
        print!("{}", result.code);
        return true;
    }
    match serde_json::to_string(result) {
        Ok(text) => {
            println!("{text}");
            true
        }
        Err(err) => {
            eprintln!("Error: {err}");
            false
        }
    }
}

fn print_ast(path: &Path, raw: bool) -> bool {
    let Some((source, name)) = read_template(path) else {
        return false;
    };

    let mut pipeline = Pipeline::standard();
    let parsed = if raw {
        pipeline.parse(&source)
    } else {
        pipeline.optimize(&source)
    };

    let ast = match parsed {
        Ok(ast) => ast,
        Err(err) => {
            report(&err.into(), &source, &name);
            return false;
        }
    };

    match nodes_to_json(&ast.nodes) {
        Ok(json) => {
            println!("{json}");
            true
        }
        Err(err) => {
            eprintln!("Error: {err}");
            false
        }
    }
}

/// Route target as listed by `upc routes`
struct Listed {
    file: String,
    role: RouteRole,
    type_name: String,
}

fn list_routes(dir: &Path, match_path: Option<&str>) -> bool {
    let mut pipeline = Pipeline::standard();
    let mut router: Router<Listed> = Router::new();
    let mut ok = true;

    for path in template_files(dir) {
        let rel = relative_path(dir, &path);
        let source = match fs::read_to_string(&path) {
            Ok(source) => source,
            Err(err) => {
                report(&CompileError::io(&path, err), "", &rel);
                ok = false;
                continue;
            }
        };
        let options = GenerateOptions {
            source_path: rel.clone(),
            ..GenerateOptions::default()
        };
        let result = match pipeline.compile(&source, &options) {
            Ok(result) => result,
            Err(err) => {
                report(&err, &source, &rel);
                ok = false;
                continue;
            }
        };

        for route in result.routes {
            let role = match route.role {
                RouteRole::Page => "page",
                RouteRole::Partial => "partial",
            };
            println!("{:<32} {:<8} {}", route.pattern, role, rel);
            let listed = Listed {
                file: rel.clone(),
                role: route.role,
                type_name: route.type_name,
            };
            if let Err(err) = router.add(&route.pattern, listed) {
                eprintln!("Error: invalid route {}: {err}", route.pattern);
                ok = false;
            }
        }
    }

    if let Some(request) = match_path {
        match router.resolve(request) {
            Resolution::Matched { target, pattern, params } => {
                println!("\n{request} -> {pattern} ({}, {:?} in {})", target.type_name, target.role, target.file);
                for (slug, value) in params {
                    println!("  {slug} = {value}");
                }
            }
            Resolution::Redirect(to) => println!("\n{request} -> 301 {to}"),
            Resolution::NotFound => {
                println!("\n{request} -> 404");
                ok = false;
            }
        }
    }

    ok
}

/// Every `.up` file under `dir`, in a stable order
fn template_files(dir: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .filter(|e| e.path().extension().is_some_and(|ext| ext == "up"))
        .map(|e| e.into_path())
        .collect();
    files.sort();
    files
}

/// `path` relative to `root`, `/`-separated
fn relative_path(root: &Path, path: &Path) -> String {
    let rel = path.strip_prefix(root).unwrap_or(path);
    rel.components()
        .map(|c| c.as_os_str().to_string_lossy())
        .collect::<Vec<_>>()
        .join("/")
}

fn read_template(path: &Path) -> Option<(String, String)> {
    if path.extension().is_none_or(|ext| ext != "up") {
        eprintln!("Error: {} is not a .up file", path.display());
        return None;
    }
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| GenerateOptions::default().source_path);
    match fs::read_to_string(path) {
        Ok(source) => Some((source, name)),
        Err(err) => {
            report(&CompileError::io(path, err), "", &name);
            None
        }
    }
}

fn report(err: &CompileError, source: &str, filename: &str) {
    if io::stderr().is_terminal() {
        eprint!("{}", err.render_color(source, filename));
    } else {
        eprint!("{}", err.render(source, filename));
    }
}

fn print_generated(path: &str) {
    let is_tty = io::stderr().is_terminal();
    if is_tty {
        eprintln!("  \x1b[32m✓\x1b[0m {}", path);
    } else {
        eprintln!("  ✓ {}", path);
    }
}

fn print_summary(count: usize, failed: usize, elapsed: std::time::Duration) {
    let is_tty = io::stderr().is_terminal();
    let time_str = format_duration(elapsed);
    let files_word = if count == 1 { "file" } else { "files" };
    let failures = if failed > 0 {
        format!(", {failed} failed")
    } else {
        String::new()
    };

    if is_tty {
        eprintln!("\n\x1b[1mCompiled {} {} in {}{}\x1b[0m", count, files_word, time_str, failures);
    } else {
        eprintln!("\nCompiled {} {} in {}{}", count, files_word, time_str, failures);
    }
}

fn format_duration(d: std::time::Duration) -> String {
    let micros = d.as_micros();
    if micros < 1000 {
        format!("{}μs", micros)
    } else if micros < 1_000_000 {
        format!("{:.1}ms", micros as f64 / 1000.0)
    } else {
        format!("{:.2}s", d.as_secs_f64())
    }
}
