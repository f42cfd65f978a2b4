use std::{fs, path::Path};

use cfb::CompoundFile;
use clap::Parser;
use msg_extract::{DecodeOptions, MsgError, MsgReader, TimestampPolicy};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Input .msg file
    file: String,

    /// Print the split transport headers
    #[arg(long)]
    headers: bool,

    /// Charset label for 8-bit strings
    #[arg(long, default_value = "iso-8859-1")]
    charset: String,

    /// Parse every date property as text, like older readers did
    #[arg(long)]
    text_dates: bool,

    /// Save attachments into this directory
    #[arg(short, long)]
    out_dir: Option<String>,
}

fn main() -> Result<(), MsgError> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let args = Args::parse();
    let mut options = DecodeOptions::default().with_narrow_charset_label(&args.charset);
    if args.text_dates {
        options = options.with_timestamp_policy(TimestampPolicy::TextOnly);
    }

    let file = fs::File::open(&args.file)?;
    let mut compound_file = CompoundFile::open(file)?;
    let mut reader = MsgReader::new(&mut compound_file, Path::new("/")).with_options(options);
    let message = reader.message()?;

    println!("Class:    {}", message.message_class.as_deref().unwrap_or("-"));
    println!("Subject:  {}", message.subject.as_deref().unwrap_or("-"));
    println!(
        "From:     {} <{}>",
        message.from.name.as_deref().unwrap_or(""),
        message.from.email.as_deref().unwrap_or("")
    );
    for recipient in reader.recipients()? {
        println!(
            "{:<9} {} <{}>",
            format!("{:?}:", message.recipient_kind(&recipient)),
            recipient.name.as_deref().unwrap_or(""),
            recipient.email.as_deref().unwrap_or("")
        );
    }
    if let Some(date) = message.date.or(message.client_submit_time) {
        println!("Date:     {}", date.to_rfc2822());
    }
    println!("Properties: {}", message.properties.len());
    if let Some(body) = &message.body_text {
        println!();
        println!("{}", body.chars().take(400).collect::<String>());
    }

    if args.headers {
        println!();
        for (name, values) in message.parse_headers()?.iter() {
            for value in values {
                println!("{name}: {value}");
            }
        }
    }

    if let Some(out_dir) = args.out_dir {
        let out_dir = Path::new(&out_dir);
        if !out_dir.is_dir() {
            fs::create_dir_all(out_dir)?;
        }
        for attachment in reader.attachments()? {
            let Some(file_name) = Path::new(&attachment.name).file_name() else {
                continue;
            };
            let full_path = out_dir.join(file_name);
            fs::write(&full_path, &attachment.data)?;
            println!("Saved attachment to {}", full_path.display());
        }
        for embedded in reader.embedded_messages()? {
            println!("Embedded message at {}", embedded.display());
        }
    }
    Ok(())
}
