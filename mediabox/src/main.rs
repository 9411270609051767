use clap::{ArgMatches, Command, arg, command, crate_name};
use client::UploadParams;

mod cli;

fn required(matches: &ArgMatches, id: &str) -> String {
    matches.get_one::<String>(id).cloned().unwrap_or_default()
}

#[tokio::main]
async fn main() {
    let cli = command!(crate_name!())
        .version(clap::crate_version!())
        .about(clap::crate_description!())
        .subcommand(Command::new(cli::VERSION_SUBCOMMAND).about(cli::VERSION_DESCRIPTION))
        .subcommand(Command::new(cli::BUGREPORT_SUBCOMMAND).about(cli::BUGREPORT_DESCRIPTION))
        .subcommand(Command::new(cli::SERVER_SUBCOMMAND).about(cli::SERVER_DESCRIPTION))
        .subcommand(
            Command::new(cli::UPLOAD_SUBCOMMAND)
                .about(cli::UPLOAD_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Mediabox URI"))
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .help("Path to photo or video to upload"),
                )
                .arg(
                    arg!(-n --name <NAME>)
                        .required(true)
                        .help("Owner name, needed later to delete the file"),
                ),
        )
        .subcommand(
            Command::new(cli::LIST_SUBCOMMAND)
                .about(cli::LIST_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Mediabox URI")),
        )
        .subcommand(
            Command::new(cli::DELETE_SUBCOMMAND)
                .about(cli::DELETE_DESCRIPTION)
                .arg(arg!(-u --uri <URI>).required(true).help("Mediabox URI"))
                .arg(
                    arg!(-f --file <FILE>)
                        .required(true)
                        .help("Stored file name as shown by list"),
                )
                .arg(
                    arg!(-n --name <NAME>)
                        .required(true)
                        .help("Owner name given at upload"),
                ),
        )
        .arg_required_else_help(true)
        .disable_version_flag(true)
        .get_matches();

    if cli.subcommand_matches(cli::VERSION_SUBCOMMAND).is_some() {
        cli::version::run();
    } else if cli.subcommand_matches(cli::BUGREPORT_SUBCOMMAND).is_some() {
        cli::bugreport::run();
    } else if cli.subcommand_matches(cli::SERVER_SUBCOMMAND).is_some() {
        cli::server::run().await;
    } else if let Some(upload_matches) = cli.subcommand_matches(cli::UPLOAD_SUBCOMMAND) {
        let params = UploadParams {
            uri: required(upload_matches, "uri"),
            file: required(upload_matches, "file"),
            name: required(upload_matches, "name"),
        };
        cli::client::upload(params).await;
    } else if let Some(list_matches) = cli.subcommand_matches(cli::LIST_SUBCOMMAND) {
        cli::client::list(&required(list_matches, "uri")).await;
    } else if let Some(delete_matches) = cli.subcommand_matches(cli::DELETE_SUBCOMMAND) {
        cli::client::delete(
            &required(delete_matches, "uri"),
            &required(delete_matches, "file"),
            &required(delete_matches, "name"),
        )
        .await;
    }
}
