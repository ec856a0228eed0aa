fn main() -> color_eyre::Result<()> {
    dialer_forms::run()
}
