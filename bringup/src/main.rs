use bringup_error::GateError;

fn main() -> anyhow::Result<()> {
    if let Err(err) = bringup::run() {
        if matches!(err.downcast_ref::<GateError>(), Some(GateError::Interrupted)) {
            eprintln!("{}", err);
            std::process::exit(130);
        }
        return Err(err);
    }
    Ok(())
}
