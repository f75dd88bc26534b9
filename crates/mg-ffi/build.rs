use std::path::PathBuf;

fn main() {
    let crate_dir = match std::env::var("CARGO_MANIFEST_DIR") {
        Ok(dir) => PathBuf::from(dir),
        Err(_) => return,
    };
    println!("cargo:rerun-if-changed=src");

    let _ = std::fs::create_dir_all(crate_dir.join("include"));
    let config = cbindgen::Config::from_file(crate_dir.join("cbindgen.toml")).unwrap_or_default();

    match cbindgen::Builder::new()
        .with_crate(&crate_dir)
        .with_config(config)
        .with_language(cbindgen::Language::C)
        .with_include_guard("MG_GEMM_H")
        .generate()
    {
        Ok(bindings) => {
            bindings.write_to_file(crate_dir.join("include/mg_gemm.h"));
        }
        Err(e) => println!("cargo:warning=unable to generate C bindings: {}", e),
    }
}
