//! Entry point. Mirrors `canopy-cli::main`'s testable-wrapper split so the
//! error-formatting/exit-code logic can be exercised without a real
//! process exit (spec §7 "user-visible failure: a non-zero exit code and a
//! single line naming the failed structure or file where possible").
fn main() {
    let result = main_impl();
    if let Err(code) = result {
        std::process::exit(code);
    }
}

fn main_impl() -> Result<(), i32> {
    main_impl_with_cli(syncoll_cli::run_cli)
}

fn main_impl_with_cli<F>(cli_fn: F) -> Result<(), i32>
where
    F: FnOnce() -> Result<(), Box<dyn std::error::Error>>,
{
    match cli_fn() {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("Error: {e}");
            Err(1)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn success_path_returns_ok() {
        let ok_cli = || -> Result<(), Box<dyn std::error::Error>> { Ok(()) };
        assert!(main_impl_with_cli(ok_cli).is_ok());
    }

    #[test]
    fn error_path_returns_exit_code_one() {
        let err_cli = || -> Result<(), Box<dyn std::error::Error>> { Err("boom".into()) };
        assert_eq!(main_impl_with_cli(err_cli), Err(1));
    }
}
