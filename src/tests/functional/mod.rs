// Licensed under the Apache-2.0 license

mod dispatch_test;
