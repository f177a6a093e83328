/// Compiles the simulation server protocol with [`tonic_prost_build`].
fn main() {
    let protos = &["proto/spice_simulator.proto"];
    let dirs = &["proto/"];
    tonic_prost_build::configure()
        .compile_protos(protos, dirs)
        .unwrap_or_else(|e| panic!("Failed to compile protos: {e:?}"));
    for file in protos {
        println!("cargo:rerun-if-changed={file}");
    }
}
