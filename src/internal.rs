pub(crate) mod entrance;
pub(crate) mod transfer;
