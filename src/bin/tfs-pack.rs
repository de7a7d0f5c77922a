use std::fs::{read_dir, File, OpenOptions};
use std::io::{Read, Seek, SeekFrom, Write};
use std::sync::{Arc, Mutex};

use clap::{App, Arg};
use tfs::{BlockDevice, Block, Cached, FileSystem, LruCache, BLOCK_SIZE, MAX_DATA_BLOCKS, MAX_INODES};

/// A disk image file used as a block device.
struct BlockFile {
    file: Mutex<File>,
    num_blocks: usize,
}

impl BlockFile {
    fn seek_to(file: &mut File, block_id: u32) -> tfs::Result<()> {
        file.seek(SeekFrom::Start(block_id as u64 * BLOCK_SIZE as u64))
            .map_err(|_| tfs::Error::IoError)?;
        Ok(())
    }
}

impl BlockDevice for BlockFile {
    fn num_blocks(&self) -> usize {
        self.num_blocks
    }

    fn read_block(&self, block_id: u32, buf: &mut Block) -> tfs::Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(tfs::Error::InvalidBlockId);
        }
        let mut file = self.file.lock().map_err(|_| tfs::Error::IoError)?;
        Self::seek_to(&mut file, block_id)?;
        file.read_exact(buf).map_err(|_| tfs::Error::IoError)
    }

    fn write_block(&self, block_id: u32, buf: &Block) -> tfs::Result<()> {
        if block_id as usize >= self.num_blocks {
            return Err(tfs::Error::InvalidBlockId);
        }
        let mut file = self.file.lock().map_err(|_| tfs::Error::IoError)?;
        Self::seek_to(&mut file, block_id)?;
        file.write_all(buf).map_err(|_| tfs::Error::IoError)
    }

    fn flush(&self) -> tfs::Result<()> {
        let mut file = self.file.lock().map_err(|_| tfs::Error::IoError)?;
        file.flush().map_err(|_| tfs::Error::IoError)
    }
}

fn main() {
    if let Err(e) = fs_pack() {
        eprintln!("tfs-pack: {}", e);
        std::process::exit(1);
    }
}

fn fs_pack() -> Result<(), Box<dyn std::error::Error>> {
    let matches = App::new("TFS image packer")
        .arg(
            Arg::with_name("image")
                .short("i")
                .long("image")
                .takes_value(true)
                .required(true)
                .help("Disk image file, created if missing"),
        )
        .arg(
            Arg::with_name("source")
                .short("s")
                .long("source")
                .takes_value(true)
                .help("Host directory whose regular files are copied into the image root"),
        )
        .arg(
            Arg::with_name("inodes")
                .long("inodes")
                .takes_value(true)
                .help("Inode count used when formatting"),
        )
        .arg(
            Arg::with_name("blocks")
                .long("blocks")
                .takes_value(true)
                .help("Data block count used when formatting"),
        )
        .get_matches();

    let image_path = matches.value_of("image").unwrap_or("DISKFILE");
    let max_inodes: u32 = match matches.value_of("inodes") {
        Some(v) => v.parse()?,
        None => MAX_INODES,
    };
    let max_data_blocks: u32 = match matches.value_of("blocks") {
        Some(v) => v.parse()?,
        None => MAX_DATA_BLOCKS,
    };
    let num_blocks = tfs::SuperBlock::new(max_inodes, max_data_blocks)?.total_blocks() as usize;

    let file = OpenOptions::new()
        .read(true)
        .write(true)
        .create(true)
        .truncate(false)
        .open(image_path)?;
    if file.metadata()?.len() < (num_blocks * BLOCK_SIZE) as u64 {
        file.set_len((num_blocks * BLOCK_SIZE) as u64)?;
    }
    let device = Cached::new(
        BlockFile {
            file: Mutex::new(file),
            num_blocks,
        },
        LruCache::new(64),
    );
    let mut fs = FileSystem::open_or_format(Arc::new(device), max_inodes, max_data_blocks)?;

    if let Some(src_path) = matches.value_of("source") {
        for dir_entry in read_dir(src_path)? {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_file() {
                continue;
            }
            let name = dir_entry.file_name().to_string_lossy().into_owned();
            let mut all_data: Vec<u8> = Vec::new();
            File::open(dir_entry.path())?.read_to_end(&mut all_data)?;
            let path = format!("/{}", name);
            match fs.create(&path, 0o644) {
                Ok(_) => {}
                Err(tfs::Error::AlreadyExists) => fs.truncate(&path, 0)?,
                Err(e) => return Err(e.into()),
            }
            fs.write(&path, 0, &all_data)?;
            println!("Packed {}, bytes: {}", name, all_data.len());
        }
    }

    for entry in fs.readdir("/")? {
        let attr = fs.getattr(&format!("/{}", entry.name_str()))?;
        println!("{:>6} {:?} {:>8} {}", attr.ino, attr.ftype, attr.size, entry.name_str());
    }
    println!("{}", fs.dump());
    fs.unmount()?;
    Ok(())
}
