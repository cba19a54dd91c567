//! Utilidades dependientes de Unix para describir propietario y permisos.

#[cfg(unix)]
pub fn owner_name(uid: u32) -> Option<String> {
    use users::get_user_by_uid;

    get_user_by_uid(uid).map(|user| user.name().to_string_lossy().into_owned())
}

#[cfg(unix)]
pub fn group_name(gid: u32) -> Option<String> {
    use users::get_group_by_gid;

    get_group_by_gid(gid).map(|group| group.name().to_string_lossy().into_owned())
}

#[cfg(not(unix))]
pub fn owner_name(_uid: u32) -> Option<String> {
    None
}

#[cfg(not(unix))]
pub fn group_name(_gid: u32) -> Option<String> {
    None
}

/// Bits de permiso en notación `0o644`.
pub fn format_octal_permissions(mode: u32) -> String {
    format!("{:#o}", mode & 0o777)
}

pub fn format_unix_permissions(mode: u32) -> String {
    const SYMBOLS: [&str; 8] = ["---", "--x", "-w-", "-wx", "r--", "r-x", "rw-", "rwx"];

    let user = SYMBOLS[((mode >> 6) & 0o7) as usize];
    let group = SYMBOLS[((mode >> 3) & 0o7) as usize];
    let other = SYMBOLS[(mode & 0o7) as usize];

    format!("{}{}{}", user, group, other)
}
