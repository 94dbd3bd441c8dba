use sheetforge::cli::CliArgs;
use sheetforge::run;

fn main() {
    let args = match CliArgs::parse_from_env() {
        Ok(parsed) => parsed,
        Err(err) => {
            eprintln!("[cli] {err}");
            std::process::exit(2);
        }
    };
    if let Err(err) = run(args) {
        eprintln!("Application error: {err:?}");
        std::process::exit(1);
    }
}
