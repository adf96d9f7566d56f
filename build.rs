fn main() {
    // N-API link setup only matters when the node bridge is compiled in.
    if std::env::var_os("CARGO_FEATURE_NAPI").is_some() {
        napi_build::setup();
    }
}
