//! Everything application code usually needs, in one import.

pub use crate::error::{Error, Result};

pub use dynarow_core::{
    AttrValue, CancellationReason, CodecError, CodecResult, Expiry, Item, KeySchema, Precondition,
    RowStatus, RowType, TableError, TableKey, TableResult, VersionedRow,
};

pub use dynarow_codec::{
    decode_row, encode_row, identity, pascal_case, ItemCodec, NameTransform, TagRegistry,
};
pub use dynarow_codec::item::{opt_field, put_field, req_field};

pub use dynarow_table::{
    Constraint, Cursor, Page, Query, Rows, SortCondition, Table, TableConfig, TransactWrite,
    TransactionOutcome, WriteEntry,
};

pub use dynarow_memstore::{BackoffPolicy, GsiMirror, IndexMirror, MemoryTable, Mutation};
