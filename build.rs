fn main() {
    // Only the ESP-IDF build needs the toolchain environment exported;
    // host builds have nothing to generate.
    #[cfg(feature = "espidf")]
    embuild::espidf::sysenv::output();
}
