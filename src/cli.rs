use clap::{value_parser, crate_version, Arg, ArgAction, ArgGroup, Command, ValueHint};

const MASK_HELP: &str = "masks are comma delimited `offset:length` pairs, numbers may be hex with `0x` prefix,
e.g., `0x214:8,0x314:8` ignores the timestamps of the first two file descriptors";
const FMT_LONG_HELP: &str = "File formats are written the way the TI catalog shows them,
e.g. `PROGRAM`, `DIS/VAR 80`, `INT/FIX 128`, the space before the length is optional.
Display files are newline delimited text on the host side, internal files are raw records.";
const RUN_LONG_HELP: &str = "The configuration file is JSON naming the tools under test.
The `asm` and `disasm` entries are required for round trips, the `errors` mode needs only `asm`
along with the annotated sources listed under `fixtures`.
Tool arguments may contain `{in}` and `{out}`, which are replaced by paths in the scratch workspace,
and `{base}`, which is replaced by the load address of the image in hex.
If `{out}` is absent the tool is expected to write its result to stdout.";

fn file_arg(help: &'static str, req: bool) -> Arg {
    Arg::new("file").short('f').long("file").value_name("NAME").required(req).help(help)
}

fn dimg_arg(req: bool) -> Arg {
    Arg::new("dimg").short('d').long("dimg").help("path to disk image itself")
        .value_name("PATH")
        .value_hint(ValueHint::FilePath)
        .required(req)
}

fn base_arg() -> Arg {
    Arg::new("base").long("base").short('b').help("load address of the image")
        .value_name("ADDRESS")
        .required(false)
}

pub fn build_cli() -> Command {
    let long_help =
"ti99check is always invoked with exactly one of several subcommands.
The disk subcommands are designed to function as nodes in a pipeline.
Set RUST_LOG environment variable to control logging level.
  levels: trace,debug,info,warn,error

Examples:
---------
make blank volume:     `ti99check mkdsk -v WORK -s 360 -d work.dsk`
put a text file:       `cat prog.txt | ti99check put -f PROG -t DIS/VAR80 -d work.dsk`
image of chunk 3:      `ti99check gen -m exhaustive -i 3 > chunk3.bin`
masked compare:        `ti99check cmp a.dsk b.dsk -m 0x214:8`
run the round trips:   `ti99check run -c tools.json --mode random`";

    let mut main_cmd = Command::new("ti99check")
        .about("Checks TI-99 toolchain programs against binary-exact round trips.")
        .after_long_help(long_help)
        .version(crate_version!());
    main_cmd = main_cmd.subcommand(
        Command::new("gen")
            .arg(Arg::new("mode").long("mode").short('m').help("how to generate the image").value_name("MODE")
                .required(true)
                .value_parser(["exhaustive","random"])
            )
            .arg(Arg::new("index").long("index").short('i').help("chunk index for exhaustive mode").value_name("INDEX")
                .value_parser(value_parser!(usize))
                .required_if_eq("mode","exhaustive")
            )
            .arg(Arg::new("seed").long("seed").short('s').help("seed for random mode").value_name("SEED")
                .value_parser(value_parser!(u64))
                .required_if_eq("mode","random")
            )
            .arg(Arg::new("capacity").long("capacity").short('c').help("image capacity in bytes for exhaustive mode")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .default_value("8192")
            )
            .arg(Arg::new("size").long("size").help("block size in bytes for random mode")
                .value_name("BYTES")
                .value_parser(value_parser!(usize))
                .default_value("2048")
            )
            .arg(base_arg())
            .about("write a generated memory image to stdout")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("mkdsk")
            .arg(Arg::new("volume").long("volume").short('v').value_name("NAME").help("volume name")
                .required(true))
            .arg(Arg::new("sectors").long("sectors").short('s').value_name("COUNT").help("total sectors")
                .value_parser(value_parser!(u16).range(34..=1600))
                .default_value("360"))
            .arg(Arg::new("sides").long("sides").value_name("COUNT").help("number of sides")
                .value_parser(value_parser!(u8).range(1..=2))
                .default_value("1"))
            .arg(Arg::new("density").long("density").value_name("CODE").help("density code, 1=single, 2=double")
                .value_parser(value_parser!(u8).range(1..=3))
                .default_value("1"))
            .arg(Arg::new("dimg").long("dimg").short('d').value_name("PATH").help("disk image path to create")
                .value_hint(ValueHint::FilePath)
                .required(true))
            .about("write a blank TI volume to the given path")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("catalog")
            .arg(dimg_arg(true))
            .visible_alias("cat")
            .about("write disk image catalog to stdout")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("put")
            .arg(file_arg("name of the file on the disk",true))
            .arg(Arg::new("type").long("type").short('t').help("file format").value_name("FORMAT")
                .long_help(FMT_LONG_HELP)
                .required(true)
            )
            .arg(dimg_arg(true))
            .about("read from stdin, write to a file on the disk image")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("get")
            .arg(file_arg("name of the file on the disk",true))
            .arg(dimg_arg(true))
            .about("read a file from the disk image, write to stdout")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("delete")
            .arg(file_arg("name of the file on the disk",true))
            .arg(dimg_arg(true))
            .visible_alias("del")
            .about("delete a file from the disk image")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("rename")
            .arg(file_arg("name of the file on the disk",true))
            .arg(Arg::new("name").long("name").short('n').help("new name").value_name("NAME").required(true))
            .arg(dimg_arg(true))
            .about("rename a file on the disk image")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("protect")
            .arg(file_arg("name of the file on the disk",true))
            .arg(Arg::new("off").long("off").help("remove the protection").action(ArgAction::SetTrue))
            .arg(dimg_arg(true))
            .about("set or clear the protection flag of a file")
    );
    main_cmd = main_cmd.subcommand(
        Command::new("cmp")
            .arg(Arg::new("original").help("reference artifact").value_name("ORIGINAL")
                .value_hint(ValueHint::FilePath)
                .required(true))
            .arg(Arg::new("result").help("artifact to check").value_name("RESULT")
                .value_hint(ValueHint::FilePath)
                .required(true))
            .arg(Arg::new("mask").long("mask").short('m').help("byte ranges to ignore").value_name("RANGES")
                .required(false))
            .arg(Arg::new("tolerance").long("tolerance").help("allowed excess length of the result").value_name("BYTES")
                .value_parser(value_parser!(usize))
                .default_value("0"))
            .arg(Arg::new("text").long("text").help("compare as text, only the first WIDTH characters of each line").value_name("WIDTH")
                .value_parser(value_parser!(usize))
                .required(false))
            .group(ArgGroup::new("how").multiple(false).args(["mask","text"]))
            .about("compare two artifacts, optionally masking regions")
            .after_help(MASK_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("run")
            .arg(Arg::new("config").long("config").short('c').help("harness configuration").value_name("PATH")
                .value_hint(ValueHint::FilePath)
                .required(true))
            .arg(Arg::new("mode").long("mode").short('m').help("which scenarios to run").value_name("MODE")
                .value_parser(["exhaustive","random","errors"])
                .default_value("random"))
            .about("run round trip or error path scenarios against the configured tools")
            .after_long_help(RUN_LONG_HELP)
    );
    main_cmd = main_cmd.subcommand(
        Command::new("completions")
            .arg(
                Arg::new("shell").short('s').long("shell").help("shell target").value_name("NAME")
                    .required(true)
                    .value_parser(["bash","elv","fish","ps1","zsh"])
            )
            .about("write completions script to stdout for the specified shell")
    );
    return main_cmd;
}
