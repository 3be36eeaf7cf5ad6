fn main() -> std::io::Result<()> {
    let mut protobuf_out = std::path::PathBuf::new();
    protobuf_out.push(&std::env::var("OUT_DIR").unwrap());
    protobuf_out.push("protobuf");
    std::fs::create_dir(&protobuf_out).ok();
    let file_descriptor_set = protox::compile(["protobuf/gtfs-realtime.proto"], ["protobuf/"])
        .map_err(|e| std::io::Error::new(std::io::ErrorKind::Other, e))?;
    prost_build::Config::new()
        .out_dir(&protobuf_out)
        .compile_fds(file_descriptor_set)?;
    Ok(())
}
