fn main() {
    std::process::exit(spendwatch_lib::run());
}
