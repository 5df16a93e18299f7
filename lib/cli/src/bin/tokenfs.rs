use token_fs_cli::cli::tokenfs_main;

fn main() -> anyhow::Result<()> {
    tokenfs_main()
}
