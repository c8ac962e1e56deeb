fn main() {
    nbody_vis::cli::run();
}
