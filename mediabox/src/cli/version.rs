use serde::Serialize;
use std::env;

#[derive(Debug, Clone, Serialize)]
struct VersionInfo {
    pub name: &'static str,
    pub version: &'static str,
    pub description: &'static str,
    pub os: &'static str,
    pub architecture: &'static str,
}

pub fn run() {
    let info = VersionInfo {
        name: clap::crate_name!(),
        version: clap::crate_version!(),
        description: clap::crate_description!(),
        os: env::consts::OS,
        architecture: env::consts::ARCH,
    };

    println!("Name           : {}", info.name);
    println!("Version        : {}", info.version);
    println!("Description    : {}", info.description);
    println!("OS             : {}", info.os);
    println!("Architecture   : {}", info.architecture);
}
