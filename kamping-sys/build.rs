// Compiles the `kamping` C shim and generates Rust declarations for it.

use std::env;
use std::path::Path;

fn main() {
    println!("cargo:rerun-if-changed=src/kamping.h");
    println!("cargo:rerun-if-changed=src/kamping.c");

    let lib = match build_probe_mpi::probe() {
        Ok(lib) => lib,
        Err(errs) => {
            println!("Could not find MPI library for various reasons:\n");
            for (i, err) in errs.iter().enumerate() {
                println!("Reason #{}:\n{}\n", i, err);
            }
            panic!();
        }
    };

    // Use the `mpicc` wrapper on Unix rather than the system C compiler.
    if !cfg!(windows) {
        env::set_var("CC", "mpicc");
    }
    let mut shim = cc::Build::new();
    shim.file("src/kamping.c");
    for inc in &lib.include_paths {
        shim.include(inc);
    }
    shim.compile("kamping_shim");

    for dir in &lib.lib_paths {
        println!("cargo:rustc-link-search=native={}", dir.display());
    }
    for lib in &lib.libs {
        println!("cargo:rustc-link-lib={}", lib);
    }

    let mut builder = bindgen::builder();
    for dir in &lib.include_paths {
        builder = builder.clang_arg(format!("-I{}", dir.display()));
    }

    let bindings = builder
        .header("src/kamping.h")
        .allowlist_function("MPI_.*")
        .allowlist_function("KAMPING_.*")
        .allowlist_var("MPI_.*")
        .allowlist_var("KAMPING_.*")
        .allowlist_type("MPI_.*")
        .blocklist_type("mpich_struct_mpi_long_double_int")
        .blocklist_type("max_align_t")
        .generate()
        .expect("bindgen failed to generate the MPI bindings");

    let out_dir = env::var("OUT_DIR").expect("cargo did not set OUT_DIR");
    let out_file = Path::new(&out_dir).join("functions_and_types.rs");
    bindings
        .write_to_file(out_file)
        .expect("could not write the MPI bindings");
}
