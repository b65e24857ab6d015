//! `scimsync version`.

pub fn execute() {
    println!("scimsync {}", crate::VERSION);
}
