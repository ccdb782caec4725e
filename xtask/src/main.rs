/// The xtask binary delegates entirely to nih_plug_xtask, which provides
/// the `bundle` subcommand. Usage:
///
///   cargo xtask bundle deeelay --release
///
/// This compiles the plugin as a cdylib and packages it into
/// `target/bundled/Deeelay.vst3` and `target/bundled/Deeelay.clap`.
fn main() -> nih_plug_xtask::Result<()> {
    nih_plug_xtask::main()
}
