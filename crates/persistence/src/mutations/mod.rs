// Copyright (C) 2026 Fred Clausen
// Use of this source code is governed by an MIT-style
// license that can be found in the LICENSE file or at
// https://opensource.org/licenses/MIT.

//! Write operations, expanded per backend by `backend_fn!`.

pub mod agencies;
pub mod applications;
pub mod audit;
pub mod invoices;
pub mod livers;
pub mod operators;
pub mod reports;
