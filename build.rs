use std::env;

fn main() {
    println!("cargo:rerun-if-env-changed=SAMPLEFORGE_OP_LIB");
    println!("cargo:rerun-if-env-changed=SAMPLEFORGE_OP_LIB_DIR");
    println!("cargo:rerun-if-env-changed=INFINI_ROOT");

    // The host operator needs nothing from the system; only the FFI path links.
    if env::var_os("CARGO_FEATURE_FFI").is_none() {
        return;
    }

    link_operator_library();
}

fn link_operator_library() {
    use std::path::Path;

    let lib_dir = env::var("SAMPLEFORGE_OP_LIB_DIR").ok().or_else(|| {
        env::var("INFINI_ROOT")
            .ok()
            .map(|root| format!("{}/lib", root))
    });

    match lib_dir {
        Some(dir) => {
            if !Path::new(&dir).exists() {
                println!(
                    "cargo:warning=operator library directory {} does not exist",
                    dir
                );
            }
            println!("cargo:rustc-link-search=native={}", dir);
        }
        None => {
            println!(
                "cargo:warning=SAMPLEFORGE_OP_LIB_DIR not set, relying on the default linker search path"
            );
        }
    }

    let lib_name = env::var("SAMPLEFORGE_OP_LIB").unwrap_or_else(|_| "infiniop".to_string());
    println!("cargo:rustc-link-lib=dylib={}", lib_name);
}
