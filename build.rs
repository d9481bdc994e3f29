fn main() {
    // `built` looks for `.git` next to the manifest. When the crate is vendored into a larger
    // checkout, fall back to the parent's `FETCH_HEAD` so the version string still carries a hash.
    if let Ok(commit_hash) = std::fs::read_to_string("../.git/FETCH_HEAD") {
        println!("cargo:rustc-env=GIT_COMMIT_HASH={}", commit_hash.trim());
    }

    built::write_built_file().expect("Failed to acquire build-time information");
}
