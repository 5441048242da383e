fn main() {
    println!("cargo:rerun-if-changed=build.rs");

    // ESP-IDF sysenv is only available when building for the device.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
