use bugreport::{
    bugreport,
    collector::{CompileTimeInformation, EnvironmentVariables, OperatingSystem, SoftwareVersion},
    format::Markdown,
};

pub fn run() {
    bugreport!()
        .info(SoftwareVersion::default())
        .info(OperatingSystem::default())
        .info(EnvironmentVariables::list(&[
            "MEDIABOX_PORT",
            "MEDIABOX_DATA_DIR",
            "MEDIABOX_UPLOAD_DIR",
            "MEDIABOX_PUBLIC_DIR",
            "RUST_LOG",
        ]))
        .info(CompileTimeInformation::default())
        .print::<Markdown>();
}
