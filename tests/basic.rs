mod common;

use std::sync::Arc;

use common::{assert_bitmap_consistent, fresh_fs, FaultyDisk, RamDisk};
use tfs::{Error, FileSystem, FileType, DIR_ENTRY_SIZE, MAX_FILE_NAME_LEN, ROOT_INODE_ID};

#[test]
fn test_format() {
    let (_, fs) = fresh_fs(64, 256);
    log!("{}", fs.dump());
    let root = fs.get_inode(ROOT_INODE_ID).unwrap();
    assert!(root.valid);
    assert_eq!(root.ftype, FileType::Directory);
    assert_eq!(root.size, 0);
    assert_eq!(root.links, 2);
    assert!(root.direct_ptrs.iter().all(|ptr| ptr.is_none()));

    let bitmap = fs.session().inode_bitmap();
    assert!(bitmap.get(0));
    assert!((1..64).all(|ino| !bitmap.get(ino)));
    assert_eq!(fs.session().data_bitmap().count_set(), 0);
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_format_too_small() {
    let rd = RamDisk::new(16);
    let result = FileSystem::format(Arc::new(rd), 64, 256);
    assert_eq!(result.err(), Some(Error::InvalidGeometry));
}

#[test]
fn test_create_file() {
    let (_, mut fs) = fresh_fs(64, 256);
    let ino = fs.create("/f", 0o644).unwrap();
    let inode = fs.lookup("/f").unwrap();
    assert_eq!(inode.ino, ino);
    assert_eq!(inode.ftype, FileType::Regular);
    assert_eq!(inode.size, 0);
    assert_eq!(inode.links, 1);
    assert_eq!(inode.mode, 0o644);

    // creating files with the same name should fail
    assert_eq!(fs.create("/f", 0o644), Err(Error::AlreadyExists));
    assert_eq!(fs.mkdir("/f", 0o755), Err(Error::AlreadyExists));
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_mkdir() {
    let (_, mut fs) = fresh_fs(64, 256);
    let d = fs.mkdir("/d", 0o755).unwrap();
    let e = fs.mkdir("/d/e", 0o755).unwrap();
    assert_eq!(fs.lookup("/d").unwrap().ino, d);
    assert_eq!(fs.lookup("/d/e").unwrap().ino, e);

    let d_inode = fs.get_inode(d).unwrap();
    assert_eq!(d_inode.size / DIR_ENTRY_SIZE as u64, 1);
    assert_eq!(d_inode.links, 3);
    assert_eq!(fs.get_inode(ROOT_INODE_ID).unwrap().links, 3);

    let names: Vec<String> = fs.readdir("/d").unwrap().iter().map(|e| e.name_str()).collect();
    assert_eq!(names, vec!["e"]);
    assert_eq!(fs.opendir("/d"), Ok(d));
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_rmdir() {
    let (_, mut fs) = fresh_fs(64, 256);
    let d = fs.mkdir("/d", 0o755).unwrap();
    fs.mkdir("/d/e", 0o755).unwrap();

    assert_eq!(fs.rmdir("/d"), Err(Error::NotEmpty));
    fs.rmdir("/d/e").unwrap();
    assert_eq!(fs.lookup("/d/e"), Err(Error::NotFound));
    fs.rmdir("/d").unwrap();

    assert!(!fs.get_inode(d).unwrap().valid);
    assert_eq!(fs.lookup("/d"), Err(Error::NotFound));
    assert_eq!(fs.get_inode(ROOT_INODE_ID).unwrap().links, 2);
    // Every directory block went back to the bitmap.
    assert_eq!(fs.session().data_bitmap().count_set(), 0);
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_type_errors() {
    let (_, mut fs) = fresh_fs(64, 256);
    fs.create("/f", 0o644).unwrap();
    fs.mkdir("/d", 0o755).unwrap();

    assert_eq!(fs.unlink("/d"), Err(Error::NotFile));
    assert_eq!(fs.rmdir("/f"), Err(Error::NotDirectory));
    assert_eq!(fs.open("/d"), Err(Error::NotFile));
    assert_eq!(fs.opendir("/f"), Err(Error::NotDirectory));
    assert_eq!(fs.create("/f/x", 0o644), Err(Error::NotDirectory));
    assert_eq!(fs.lookup("/f/x"), Err(Error::NotDirectory));
    assert_eq!(fs.readdir("/f").err(), Some(Error::NotDirectory));
}

#[test]
fn test_path_errors() {
    let (_, mut fs) = fresh_fs(64, 256);
    assert_eq!(fs.create("/missing/x", 0o644), Err(Error::NotFound));
    assert_eq!(fs.rmdir("/"), Err(Error::InvalidPath));
    assert_eq!(fs.unlink(""), Err(Error::InvalidPath));
    assert_eq!(fs.lookup(""), Err(Error::InvalidPath));

    let long_name = format!("/{}", "n".repeat(MAX_FILE_NAME_LEN + 1));
    assert_eq!(fs.create(&long_name, 0o644), Err(Error::NameTooLong));
    let max_name = format!("/{}", "n".repeat(MAX_FILE_NAME_LEN));
    fs.create(&max_name, 0o644).unwrap();
    assert!(fs.lookup(&max_name).is_ok());
}

#[test]
fn test_open_close() {
    let (_, mut fs) = fresh_fs(64, 256);
    let ino = fs.create("/a", 0o600).unwrap();
    assert_eq!(fs.open("/a"), Ok(ino));
    assert_eq!(fs.close(ino), Ok(()));
    assert_eq!(fs.open("/b"), Err(Error::NotFound));
    fs.unlink("/a").unwrap();
    assert_eq!(fs.close(ino), Err(Error::NotFound));
    assert_eq!(fs.releasedir("/"), Ok(()));
}

#[test]
fn test_getattr_utimens() {
    let (_, mut fs) = fresh_fs(64, 256);
    fs.create("/a", 0o640).unwrap();
    fs.write("/a", 0, &[1u8; 5000]).unwrap();
    fs.utimens("/a", 12345).unwrap();
    let attr = fs.getattr("/a").unwrap();
    assert_eq!(attr.ftype, FileType::Regular);
    assert_eq!(attr.mode, 0o640);
    assert_eq!(attr.links, 1);
    assert_eq!(attr.size, 5000);
    assert_eq!(attr.blocks, 2);
    assert_eq!(attr.mtime, 12345);
    assert_eq!(fs.getattr("/").unwrap().ino, ROOT_INODE_ID);
}

#[test]
fn test_resource_release() {
    // Test inode releasing.
    let (_, mut fs) = fresh_fs(64, 256);
    let stat = fs.statfs();
    assert_eq!(stat.free_inodes, 63); // Root is taken.
    assert_eq!(stat.free_blocks, 256);

    let ino = fs.create("/test.txt", 0o644).unwrap();
    assert_eq!(ino, 1); // First inode after root.
    fs.write("/test.txt", 0, &[7u8; 3 * 4096]).unwrap();
    assert_eq!(fs.statfs().free_blocks, 256 - 4); // Root directory block and three file blocks.
    assert_eq!(fs.statfs().free_inodes, 62);

    fs.unlink("/test.txt").unwrap();
    assert_eq!(fs.statfs().free_inodes, 63); // Inode released.
    assert_eq!(fs.statfs().free_blocks, 256); // File blocks and the emptied root block released.
    assert!(!fs.get_inode(ino).unwrap().valid);

    let ino = fs.create("/test2.txt", 0o644).unwrap();
    assert_eq!(ino, 1); // Reused inode.
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_remove_many() {
    // Create a bunch of files and directories and remove them again.
    let (_, mut fs) = fresh_fs(64, 256);
    for i in 0..40 {
        if i % 3 == 0 {
            fs.mkdir(&format!("/dir_{}", i), 0o755).unwrap();
        } else {
            fs.create(&format!("/file_{}.txt", i), 0o644).unwrap();
        }
    }
    assert_eq!(fs.readdir("/").unwrap().len(), 40);
    assert_bitmap_consistent(&fs);

    for i in (0..40).rev() {
        if i % 3 == 0 {
            fs.rmdir(&format!("/dir_{}", i)).unwrap();
        } else {
            fs.unlink(&format!("/file_{}.txt", i)).unwrap();
        }
    }
    assert!(fs.readdir("/").unwrap().is_empty());
    let root = fs.get_inode(ROOT_INODE_ID).unwrap();
    // Size counts entries ever added and is not decremented on removal.
    assert_eq!(root.size, 40 * DIR_ENTRY_SIZE as u64);
    assert_eq!(root.links, 2);
    assert!(root.direct_ptrs.iter().all(|ptr| ptr.is_none()));
    assert_eq!(fs.statfs().free_inodes, 63);
    assert_bitmap_consistent(&fs);
}

#[test]
fn test_directory_full() {
    // 16 blocks of 16 entries is all a directory can hold.
    let (_, mut fs) = fresh_fs(512, 64);
    for i in 0..256 {
        fs.create(&format!("/f{}", i), 0o644).unwrap();
    }
    assert_eq!(fs.get_inode(ROOT_INODE_ID).unwrap().blocks(), 16);
    assert_eq!(fs.create("/one_more", 0o644), Err(Error::NoSpace));
    assert_eq!(fs.mkdir("/one_more", 0o755), Err(Error::NoSpace));

    // A freed slot is usable again.
    fs.unlink("/f100").unwrap();
    fs.create("/one_more", 0o644).unwrap();
    assert!(fs.lookup("/one_more").is_ok());
}

#[test]
fn test_remount() {
    let (rd, mut fs) = fresh_fs(64, 256);
    fs.mkdir("/usr", 0o755).unwrap();
    fs.create("/usr/hello", 0o644).unwrap();
    fs.write("/usr/hello", 0, b"Hello, world!").unwrap();
    fs.unmount().unwrap();

    let mut fs = FileSystem::mount(Arc::new(rd.clone())).unwrap();
    let mut buf = [0u8; 64];
    let len = fs.read("/usr/hello", 0, &mut buf).unwrap();
    assert_eq!(&buf[..len], b"Hello, world!");
    assert_bitmap_consistent(&fs);

    // The bitmaps came back too: the next inode is not a reused one.
    let ino = fs.create("/usr/other", 0o644).unwrap();
    assert_eq!(ino, 3);
    drop(fs);

    // Dropping the session checkpoints it.
    let fs = FileSystem::mount(Arc::new(rd)).unwrap();
    assert_eq!(fs.lookup("/usr/other").unwrap().ino, 3);
    assert!(fs.session().inode_bitmap().get(3));
}

#[test]
fn test_mount_unformatted() {
    let rd = RamDisk::for_geometry(64, 256);
    let result = FileSystem::mount(Arc::new(rd));
    assert_eq!(result.err(), Some(Error::InvalidSuperBlock));
}

#[test]
fn test_open_or_format() {
    let rd = RamDisk::for_geometry(64, 256);
    let mut fs = FileSystem::open_or_format(Arc::new(rd.clone()), 64, 256).unwrap();
    fs.create("/kept", 0o644).unwrap();
    fs.unmount().unwrap();

    let fs = FileSystem::open_or_format(Arc::new(rd), 64, 256).unwrap();
    assert!(fs.lookup("/kept").is_ok());
}

#[test]
fn test_io_error() {
    let disk = Arc::new(FaultyDisk::new(RamDisk::for_geometry(64, 256)));
    let mut fs = FileSystem::format(Arc::clone(&disk), 64, 256).unwrap();
    fs.create("/a", 0o644).unwrap();
    fs.flush().unwrap();

    disk.set_failing(true);
    assert_eq!(fs.lookup("/a"), Err(Error::IoError));
    assert_eq!(fs.create("/b", 0o644), Err(Error::IoError));
    assert_eq!(Error::IoError.errno(), 5);
    disk.set_failing(false);
    assert!(fs.lookup("/a").is_ok());
}
