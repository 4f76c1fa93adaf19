use std::env;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use favtree_store::{paths, FavoriteEntity, FavoriteId, FavoritesStore};

#[derive(Parser)]
#[command(
    name = "favtree-cli",
    about = "Workspace favorites from the command line",
    author,
    version
)]
struct Cli {
    /// 工作區識別檔案的路徑。 / Path of the workspace's identifying file.
    #[arg(long, value_name = "PATH")]
    workspace: PathBuf,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// 列出整棵最愛樹。 / Print the favorites tree.
    List,
    /// 新增檔案至最愛。 / Add a file to the favorites.
    Add(AddArgs),
    /// 建立最愛資料夾。 / Create a favorites folder.
    NewFolder(NewFolderArgs),
    /// 搬移項目至資料夾或根層級。 / Move an item into a folder or back to the root.
    Move(MoveArgs),
    /// 重新命名項目。 / Rename an item.
    Rename(RenameArgs),
    /// 移除項目；資料夾含其整棵子樹。 / Remove an item; folders take their subtree.
    Remove(RemoveArgs),
    /// 檢查檔案是否已收藏。 / Report whether a file is favorited.
    Check(CheckArgs),
    /// 將磁碟目錄匯入為巢狀資料夾。 / Import a directory on disk as nested folders.
    Import(ImportArgs),
}

#[derive(Args)]
struct AddArgs {
    /// 要收藏的檔案。 / File to favorite.
    file: PathBuf,
    /// 目標資料夾識別碼；預設加入根層級。 / Target folder id; defaults to the root.
    #[arg(long, value_name = "ID")]
    folder: Option<FavoriteId>,
}

#[derive(Args)]
struct NewFolderArgs {
    /// 資料夾名稱。 / Folder name.
    name: String,
    /// 上層資料夾識別碼；預設建立於根層級。 / Parent folder id; defaults to the root.
    #[arg(long, value_name = "ID")]
    parent: Option<FavoriteId>,
}

#[derive(Args)]
struct MoveArgs {
    /// 要搬移的項目識別碼。 / Id of the item to move.
    id: FavoriteId,
    /// 目標資料夾識別碼；省略時移回根層級。 / Destination folder id; omit to move to the root.
    #[arg(long, value_name = "ID")]
    into: Option<FavoriteId>,
}

#[derive(Args)]
struct RenameArgs {
    /// 要重新命名的項目識別碼。 / Id of the item to rename.
    id: FavoriteId,
    /// 新名稱。 / New display name.
    name: String,
}

#[derive(Args)]
struct RemoveArgs {
    /// 要移除的項目識別碼。 / Id of the item to remove.
    id: FavoriteId,
}

#[derive(Args)]
struct CheckArgs {
    /// 要檢查的檔案。 / File to check.
    file: PathBuf,
}

#[derive(Args)]
struct ImportArgs {
    /// 要匯入的目錄。 / Directory to import.
    dir: PathBuf,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let mut store = FavoritesStore::new();
    store.load_for_workspace(&cli.workspace);

    match cli.command {
        Commands::List => {
            let roots = store.get_root_items();
            if roots.is_empty() {
                println!("no favorites");
            } else {
                print_tree(&store, &roots, 0);
            }
        }
        Commands::Add(args) => {
            let absolute = absolutize(&args.file)?;
            let added = match args.folder {
                Some(folder) => store.add_file_to_folder(&absolute, folder),
                None => store.add_file(&absolute),
            };
            match added {
                Some(entity) => println!("added {} [{}]", entity.name, entity.id),
                None => bail!(
                    "{} is already favorited, or the target folder does not exist",
                    absolute.display()
                ),
            }
        }
        Commands::NewFolder(args) => {
            let created = match args.parent {
                Some(parent) => store.create_folder_in(&args.name, parent),
                None => store.create_folder(&args.name),
            };
            match created {
                Some(folder) => println!("created {}/ [{}]", folder.name, folder.id),
                None => bail!("invalid folder name or unknown parent folder"),
            }
        }
        Commands::Move(args) => {
            if !store.move_item(args.id, args.into) {
                bail!("cannot move {}: unknown item or invalid target", args.id);
            }
            println!("moved {}", args.id);
        }
        Commands::Rename(args) => {
            if args.name.trim().is_empty() {
                bail!("the new name must not be blank");
            }
            if store.get_item(args.id).is_none() {
                bail!("no favorite with id {}", args.id);
            }
            store.rename(args.id, &args.name);
            println!("renamed {} to {}", args.id, args.name.trim());
        }
        Commands::Remove(args) => {
            let Some(entity) = store.get_item(args.id) else {
                bail!("no favorite with id {}", args.id);
            };
            let name = entity.name.clone();
            store.remove(args.id);
            println!("removed {name}");
        }
        Commands::Check(args) => {
            let absolute = absolutize(&args.file)?;
            if store.is_file_favorited(&absolute) {
                println!("favorited");
            } else {
                println!("not favorited");
            }
        }
        Commands::Import(args) => {
            let absolute = absolutize(&args.dir)?;
            if !absolute.is_dir() {
                bail!("{} is not a directory", absolute.display());
            }
            match store.import_directory(&absolute) {
                Some(folder) => println!(
                    "imported {}/ [{}] with {} entries",
                    folder.name,
                    folder.id,
                    folder.children().len()
                ),
                None => bail!("could not import {}", absolute.display()),
            }
        }
    }

    Ok(())
}

fn absolutize(path: &Path) -> Result<PathBuf> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }
    let cwd = env::current_dir().context("cannot resolve the current directory")?;
    Ok(paths::to_absolute(path, &cwd))
}

fn print_tree(store: &FavoritesStore, items: &[FavoriteEntity], depth: usize) {
    for item in items {
        let indent = "  ".repeat(depth);
        match item.file_path() {
            None => {
                println!("{indent}{}/  [{}]", item.name, item.id);
                print_tree(store, &store.get_children(item.id), depth + 1);
            }
            Some(stored) => {
                let absolute = store.to_absolute_path(stored);
                let marker = if absolute.is_file() { "" } else { "  (missing)" };
                println!("{indent}{}  [{}]{marker}", item.name, item.id);
            }
        }
    }
}
