fn main() {
    // Stamp the build time into FixtureKit's version banner
    let stamp = chrono::Utc::now().format("%Y-%m-%d %H:%M UTC").to_string();
    println!("cargo:rustc-env=FIXTUREKIT_BUILD_DATE={stamp}");
    println!("cargo:rerun-if-changed=build.rs");
}
