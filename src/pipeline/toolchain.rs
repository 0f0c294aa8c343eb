//! Fixed toolchain invocation
//!
//! Target, flags and sysroot layout are constants. Only where the binaries
//! are served from is configurable.

/// Source file handed to the compiler
pub const ENTRY_PATH: &str = "/main.cpp";
/// Object file the compiler writes and the linker reads
pub const OBJECT_PATH: &str = "/program.o";
/// Module the linker writes and the run stage executes
pub const EXECUTABLE_PATH: &str = "/program.wasm";

pub const SYSROOT: &str = "/sys";
pub const CLANG_VERSION: &str = "8.0.1";
pub const LIB_DIR: &str = "/sys/lib/wasm32-wasi";

pub const COMPILER_PROCESS: &str = "clang";
pub const LINKER_PROCESS: &str = "wasm-ld";
pub const PROGRAM_PROCESS: &str = "program";

/// Linker stack size in bytes
pub const STACK_SIZE: u32 = 1024 * 1024;

/// System include directories, in search order (libc++ before libc)
pub fn include_dirs() -> [String; 3] {
    [
        format!("{}/include/c++/v1", SYSROOT),
        format!("{}/include", SYSROOT),
        format!("{}/lib/clang/{}/include", SYSROOT, CLANG_VERSION),
    ]
}

/// Compiler arguments after argv[0]
pub fn compile_args() -> Vec<String> {
    let mut args: Vec<String> = [
        "-cc1",
        "-v",
        "-Werror",
        "-emit-obj",
        "-disable-free",
        "-isysroot",
        SYSROOT,
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();

    for dir in include_dirs() {
        args.push("-internal-isystem".to_string());
        args.push(dir);
    }

    args.extend(
        [
            "-ferror-limit",
            "4",
            "-fmessage-length",
            "80",
            "-fcolor-diagnostics",
            "-O2",
            "-o",
            OBJECT_PATH,
            "-x",
            "c++",
            ENTRY_PATH,
        ]
        .iter()
        .map(|s| s.to_string()),
    );
    args
}

/// Linker arguments after argv[0]
pub fn link_args() -> Vec<String> {
    vec![
        "--no-threads".to_string(),
        "--export-dynamic".to_string(),
        "--verbose".to_string(),
        "-z".to_string(),
        format!("stack-size={}", STACK_SIZE),
        format!("-L{}", LIB_DIR),
        format!("{}/crt1.o", LIB_DIR),
        OBJECT_PATH.to_string(),
        "-lc".to_string(),
        "-lc++".to_string(),
        "-lc++abi".to_string(),
        "-o".to_string(),
        EXECUTABLE_PATH.to_string(),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_compile_args() {
        let args = compile_args();
        assert_eq!(args[0], "-cc1");
        assert_eq!(args.last().map(String::as_str), Some(ENTRY_PATH));

        let joined = args.join(" ");
        assert!(joined.contains("-internal-isystem /sys/include/c++/v1 -internal-isystem /sys/include "));
        assert!(joined.contains("/sys/lib/clang/8.0.1/include"));
        assert!(joined.contains("-o /program.o -x c++"));
    }

    #[test]
    fn test_link_args() {
        let args = link_args();
        assert!(args.contains(&"stack-size=1048576".to_string()));
        assert!(args.contains(&"-L/sys/lib/wasm32-wasi".to_string()));
        assert!(args.contains(&"/sys/lib/wasm32-wasi/crt1.o".to_string()));

        let obj = args.iter().position(|a| a == OBJECT_PATH).unwrap();
        let libc = args.iter().position(|a| a == "-lc").unwrap();
        assert!(obj < libc, "object must precede libraries");
        assert_eq!(&args[args.len() - 2..], ["-o", EXECUTABLE_PATH]);
    }
}
