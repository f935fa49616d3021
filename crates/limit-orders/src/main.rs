fn main() -> anyhow::Result<()> {
    limit_orders::start(std::env::args())
}
