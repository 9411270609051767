use client::UploadParams;

pub async fn upload(params: UploadParams) {
    let file = params.file.clone();
    match client::upload_file(params).await {
        Ok(status) => println!("file {file} uploaded. Status: {status}"),
        Err(e) => eprintln!("upload error: {e}"),
    }
}

pub async fn list(uri: &str) {
    match client::list_files(uri).await {
        Ok(records) => println!("{}", client::render_table(&records)),
        Err(e) => eprintln!("list error: {e}"),
    }
}

pub async fn delete(uri: &str, file: &str, name: &str) {
    match client::delete_file(uri, file, name).await {
        Ok(_) => println!("file {file} deleted"),
        Err(e) => eprintln!("delete error: {e}"),
    }
}
